//! Bounded-retry-with-delay wrapper for scheduling operations.

use std::future::Future;
use std::time::Duration;

use crate::error::DispatchError;

pub const DEFAULT_RETRY_LIMIT: u32 = 10;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BATCH_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Run `op` up to `retry_limit` times, sleeping `retry_interval` between
/// attempts (fixed interval, no jitter or backoff). The sleep happens
/// inline on the caller's task; nothing is spawned.
///
/// `retry_limit == 0` is a distinct code path: invoke once and propagate
/// the error unmodified. Otherwise, after exactly `retry_limit` failed
/// attempts, the last error is returned wrapped in
/// [`DispatchError::RetryExhausted`], whose message is prefixed with
/// "Task scheduling limit exhausted".
///
/// `op` must produce a fresh future per attempt — a deferred, repeatable
/// action, never a pre-computed result.
pub async fn with_retry<T, F, Fut>(
    retry_limit: u32,
    retry_interval: Duration,
    mut op: F,
) -> Result<T, DispatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DispatchError>>,
{
    if retry_limit == 0 {
        return op().await;
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= retry_limit {
                    return Err(DispatchError::RetryExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                tracing::warn!(
                    attempt,
                    retry_limit,
                    error = %err,
                    "task scheduling failed, retrying"
                );
                tokio::time::sleep(retry_interval).await;
            }
        }
    }
}
