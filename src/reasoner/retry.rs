//! Retry with exponential backoff.
//!
//! Only transient failures (rate limits, 5xx, transport) are retried;
//! everything else returns to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use super::ReasonerError;

/// Attempts made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles after every failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Run `op` until it succeeds, a non-transient error occurs, or
/// `max_attempts` transient failures accumulate. Always makes at least
/// one attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, ReasonerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReasonerError>>,
{
    let mut delay = base_delay;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient reasoner failure, will retry"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
