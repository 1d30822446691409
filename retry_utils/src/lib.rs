use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Classification of errors for retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableError {
    /// 401 Unauthorized - run the recovery step (e.g. refresh credentials), then retry
    Unauthorized,
    /// Other errors - don't retry
    Other,
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including initial attempt)
    pub max_attempts: u32,
    /// Pause between a successful recovery and the retried call (milliseconds)
    pub recovery_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            recovery_delay_ms: 0,
        }
    }
}

/// Retry an async operation after running a recovery step.
///
/// # Arguments
/// * `operation` - The async operation to retry (should be a closure that returns a Future)
/// * `recover` - Runs before every retry; its failure ends the loop with that error
/// * `config` - Retry configuration
/// * `classify_error` - Function to classify errors for retry strategy
///
/// # Returns
/// * `Ok(T)` - Operation succeeded (either on first attempt or after retries)
/// * `Err(E)` - Operation failed with a non-retryable error, recovery failed,
///   or retries were exhausted (the last operation error is returned)
///
/// # Example
/// ```ignore
/// let result = retry_with_recovery(
///     || async { call_with_token().await },
///     || async { refresh_token().await },
///     &RetryConfig::default(),
///     |e| if e.is_unauthorized() { RetryableError::Unauthorized } else { RetryableError::Other }
/// ).await;
/// ```
pub async fn retry_with_recovery<F, Fut, R, RFut, T, E>(
    mut operation: F,
    mut recover: R,
    config: &RetryConfig,
    classify_error: impl Fn(&E) -> RetryableError,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut() -> RFut,
    RFut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("✅ Operation succeeded after {} retry attempts", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let error_type = classify_error(&e);

                if error_type == RetryableError::Other {
                    return Err(e);
                }

                if attempt >= config.max_attempts {
                    error!(
                        "❌ Operation failed after {} attempts (max retries exhausted): {}",
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                warn!(
                    "⚠️  Operation failed (attempt {}/{}): {} - recovering before retry (error type: {:?})",
                    attempt + 1,
                    config.max_attempts + 1,
                    e,
                    error_type
                );

                if let Err(recovery_error) = recover().await {
                    error!("❌ Recovery before retry failed: {}", recovery_error);
                    return Err(recovery_error);
                }

                if config.recovery_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(config.recovery_delay_ms)).await;
                }

                attempt += 1;
            }
        }
    }
}
