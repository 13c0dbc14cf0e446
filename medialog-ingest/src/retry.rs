//! Bounded retry with exponential backoff
//!
//! Transient source failures are retried a fixed number of times with a
//! doubling delay; everything else fails immediately. There is no unbounded
//! retry loop and no cross-run state.

use crate::types::SourceError;
use std::time::Duration;

/// Retry policy for external metadata lookups
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry; doubles each subsequent attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Run `operation` under the retry policy.
///
/// **Algorithm:**
/// 1. Attempt the operation
/// 2. On success, return the result
/// 3. On a transient error with retries remaining: log WARN, back off, retry
/// 4. On a non-transient error, or after retries are exhausted: return the error
pub async fn with_retries<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    let mut backoff = policy.base_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Lookup succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                if attempt > policy.max_retries {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Lookup failed, retries exhausted"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient lookup failure, will retry after backoff"
                );

                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}
