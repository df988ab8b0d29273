pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig};
pub use timeout::with_timeout;
