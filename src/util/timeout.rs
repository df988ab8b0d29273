use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{AppError, AppResult};

/// Bounds an outbound store call. Elapse is reported as `AppError::Timeout`
/// so callers can treat it like any other transient failure.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(duration)),
    }
}
