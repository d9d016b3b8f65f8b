//! Retry with exponential backoff for calls to remote capabilities.
//!
//! Only the network-backed capability uses this. The orchestrator never retries
//! a failed call; a caller wanting another attempt issues a fresh request.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Factor applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset for a remote capability call: 3 attempts, waits of 1s then 2s.
    pub fn remote_call() -> Self {
        Self::new(3, Duration::from_secs(1)).with_max_delay(Duration::from_secs(5))
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before attempt `attempt` (0-indexed); the first attempt never waits.
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let millis =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::remote_call()
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects an error, or
/// `config.max_attempts` is used up. Returns the last error on failure.
///
/// # Panics
/// Panics if `config.max_attempts` is 0
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    assert!(
        config.max_attempts >= 1,
        "RetryConfig.max_attempts must be >= 1, got {}",
        config.max_attempts
    );

    let mut attempt = 0;
    loop {
        let delay = config.delay_before(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: waiting {:?} before attempt {}/{}",
                operation_name,
                delay,
                attempt + 1,
                config.max_attempts
            );
            sleep(delay).await;
        }

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        attempt += 1;

        if !should_retry(&error) {
            debug!("{}: not retrying: {}", operation_name, error);
            return Err(error);
        }
        if attempt >= config.max_attempts {
            warn!(
                "{}: giving up after {} attempts: {}",
                operation_name, config.max_attempts, error
            );
            return Err(error);
        }

        warn!(
            "{}: attempt {}/{} failed ({})",
            operation_name, attempt, config.max_attempts, error
        );
    }
}
