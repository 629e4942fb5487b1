//! Exponential backoff for flaky upstream downloads.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How often, and how patiently, to retry a failing operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total tries, the first one included
    pub max_attempts: u32,
    /// Pause before the second try
    pub initial_delay: Duration,
    /// Upper bound for any single pause
    pub max_delay: Duration,
    /// Growth factor applied to the pause after every failure
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

    /// Four tries, pausing 2s, 4s and 8s in between.
    pub fn registry_download() -> Self {
        Self::new(4, Duration::from_secs(2)).with_max_delay(Duration::from_secs(10))
    }

    /// Pause before retry number `retry` (1 for the first retry).
    fn backoff(&self, retry: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1) as i32);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// `config.max_attempts` tries have been made. The last error is returned.
///
/// # Panics
/// If `config.max_attempts` is 0.
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
        config.max_attempts > 0,
        "retry config needs at least one attempt"
    );

    let mut attempt = 1;
    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} recovered on try {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !should_retry(&error) {
            debug!("{} failed permanently: {}", operation_name, error);
            return Err(error);
        }
        if attempt == config.max_attempts {
            warn!(
                "{} gave up after {} tries: {}",
                operation_name, attempt, error
            );
            return Err(error);
        }

        let pause = config.backoff(attempt);
        warn!(
            "{} failed on try {}/{} ({}), retrying in {:?}",
            operation_name, attempt, config.max_attempts, error, pause
        );
        sleep(pause).await;
        attempt += 1;
    }
}
