use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not a participant of this conversation")]
    NotParticipant,

    #[error("not found")]
    NotFound,

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("realtime channel error: {0}")]
    Channel(#[from] redis::RedisError),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("messages for conversation {conversation_id} were removed but the conversation row was not; refresh the list")]
    PartialDelete {
        conversation_id: Uuid,
        #[source]
        source: sqlx::Error,
    },
}

impl AppError {
    /// Whether a caller may reasonably try the operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            AppError::Channel(e) => e.is_io_error(),
            _ => false,
        }
    }
}
