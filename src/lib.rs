pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod inbox;
pub mod logging;
pub mod models;
pub mod notify;
pub mod realtime;
pub mod redis_client;
pub mod store;
pub mod util;
