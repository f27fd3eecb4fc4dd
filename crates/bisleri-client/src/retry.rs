//! Linear back-off for idempotent page loads.
//!
//! Only transient failures are retried: 5xx, 429 and transport errors.
//! Every other error, including a login redirect, returns on first sight.

use std::future::Future;
use std::time::Duration;

use crate::{Deadline, StorefrontError};

pub(crate) fn is_retriable(err: &StorefrontError) -> bool {
    err.is_transient()
}

/// Runs `operation` up to `max_attempts` times. Before attempt `n + 1` it
/// sleeps `n * step`, bounded by `deadline`.
pub(crate) async fn retry_linear<T, F, Fut>(
    label: &str,
    max_attempts: u32,
    step: Duration,
    deadline: &Deadline,
    mut operation: F,
) -> Result<T, StorefrontError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorefrontError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) => return Err(err),
            Err(err) if attempt >= max_attempts => {
                return Err(StorefrontError::RetriesExhausted {
                    path: label.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                let delay = step * attempt;
                tracing::warn!(
                    path = label,
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient storefront error, retrying"
                );
                deadline.sleep(delay).await?;
                attempt += 1;
            }
        }
    }
}
