use crawler_core::{AppConfig, CoreError, WeiboApiError};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Linear backoff unit (in milliseconds)
    pub backoff_interval_ms: u64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Response statuses worth another attempt
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_interval_ms: config.backoff_interval_ms,
            jitter_factor: config.jitter_factor,
            retry_statuses: config.retry_statuses.clone(),
        }
    }
}

impl RetryConfig {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Determine retry strategy based on error type
    pub fn strategy_for(&self, error: &CoreError) -> RetryStrategy {
        match error {
            CoreError::WeiboApi(api_error) => match api_error {
                WeiboApiError::RequestFailed { status, .. }
                    if self.retry_statuses.contains(status) =>
                {
                    RetryStrategy::Retry
                }
                WeiboApiError::RequestTimeout { .. } => RetryStrategy::Retry,
                _ => RetryStrategy::NoRetry,
            },
            // Network errors might be transient
            CoreError::Network(reqwest_error) => {
                if reqwest_error.is_timeout() || reqwest_error.is_connect() {
                    RetryStrategy::Retry
                } else {
                    RetryStrategy::NoRetry
                }
            }
            _ => RetryStrategy::NoRetry,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    Retry,
    NoRetry,
}

/// Delay before retry number `retry` (1-based): `backoff_interval × retry`,
/// plus up to `jitter_factor` of that.
pub fn calculate_delay(retry: u32, config: &RetryConfig) -> Duration {
    let linear_ms = config.backoff_interval_ms.saturating_mul(retry as u64);

    let jitter_range = (linear_ms as f64 * config.jitter_factor.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        fastrand::u64(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(linear_ms.saturating_add(jitter))
}

/// Retry metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub failed_operations: u64,
}

/// Retry executor that wraps operations with retry logic
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    metrics: Mutex<RetryMetrics>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: Mutex::new(RetryMetrics::default()),
        }
    }

    /// Execute an operation, retrying transient failures. When retries run
    /// out the last error is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut total_delay = Duration::ZERO;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if attempt > 1 {
                debug!("Retry attempt {} for {}", attempt - 1, operation_name);
            }

            let start_time = Instant::now();
            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        let mut metrics = self.lock_metrics();
                        metrics.total_retries += (attempt - 1) as u64;
                        metrics.successful_retries += 1;

                        info!(
                            "Operation {} succeeded after {} retries (total delay: {:?})",
                            operation_name,
                            attempt - 1,
                            total_delay
                        );
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            debug!(
                "Attempt {} failed for {} after {:?}: {}",
                attempt,
                operation_name,
                start_time.elapsed(),
                error
            );

            let strategy = self.config.strategy_for(&error);
            if strategy == RetryStrategy::Retry && attempt < max_attempts {
                let delay = calculate_delay(attempt, &self.config);
                total_delay += delay;
                warn!(
                    "Retrying {} in {:?} due to: {}",
                    operation_name, delay, error
                );
                sleep(delay).await;
                continue;
            }

            {
                let mut metrics = self.lock_metrics();
                metrics.total_retries += (attempt - 1) as u64;
                metrics.failed_operations += 1;
            }

            if strategy == RetryStrategy::Retry {
                error!(
                    "Operation {} failed after {} attempts with total delay of {:?}",
                    operation_name, attempt, total_delay
                );
            } else {
                debug!("Not retrying {} due to error type: {}", operation_name, error);
            }
            return Err(error);
        }
    }

    /// Get current retry metrics
    pub fn get_metrics(&self) -> RetryMetrics {
        self.lock_metrics().clone()
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, RetryMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
