//! Timeout enforcement.
//!
//! Store calls that exceed their deadline are cancelled and reported as
//! `StoreUnavailable`, the same class as a refused connection.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Run `operation`, failing with `StoreUnavailable` once `deadline` elapses.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, operation).await?
}
