//! Timeout enforcement.
//!
//! Every upstream attempt runs under its own deadline; an elapsed deadline
//! becomes `UpstreamError::Timeout`, which is transient.

use std::future::Future;
use std::time::Duration;

use crate::upstream::error::UpstreamError;

/// Run `fut` under `limit`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(limit)),
    }
}
