//! Bounded retry for page fetches
//!
//! Transient failures (timeouts, connection errors, 429 and 5xx responses)
//! are retried after a fixed pause. Everything else is returned immediately.

use crate::FetchError;
use std::future::Future;
use std::time::Duration;

/// Executes `operation`, retrying transient failures up to `max_retries` times
///
/// With `max_retries = 0` the operation runs exactly once. With
/// `max_retries = 3` it runs at most 4 times, sleeping `delay_ms` before
/// each retry. The last error is returned once retries are exhausted.
pub async fn retry_with_delay<T, F, Fut>(
    max_retries: u32,
    delay_ms: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    "Transient fetch failure (attempt {} of {}): {}",
                    attempt,
                    max_retries + 1,
                    err
                );
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
