//! Deadlines for store operations
//!
//! Wraps a transaction attempt or a read so a stuck lock or connection surfaces as an
//! error instead of hanging the request. The wrapped future is dropped on
//! expiry, which rolls back any open transaction it owns.

use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{EconomyError, EconomyResult};

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run an operation with a deadline
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `EconomyResult<T>` - Result or `EconomyError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> EconomyResult<T>
where
    F: std::future::Future<Output = EconomyResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(EconomyError::Timeout(duration)),
    }
}
