//! Retries for dictionary fetches.
//!
//! Providers may sit on slow or flaky storage. Transient failures are retried
//! with exponential backoff; a missing or unparseable dictionary file fails
//! immediately since another attempt cannot fix it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff schedule for a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included (at least 1)
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Growth factor between consecutive waits
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(5),
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

    /// Preset: dictionary fetches.
    /// Waits 200ms then 400ms, three attempts in total.
    pub fn dictionary_fetch() -> Self {
        Self::new(3, Duration::from_millis(200)).with_max_delay(Duration::from_secs(1))
    }

    /// Preset: a single attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Waits between consecutive attempts, `max_attempts - 1` of them.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let config = self.clone();
        (0..config.max_attempts.saturating_sub(1)).map(move |retry| config.wait_before(retry))
    }

    fn wait_before(&self, retry: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(retry as i32);
        if !secs.is_finite() || secs >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::dictionary_fetch()
    }
}

/// Whether another attempt could succeed.
///
/// Missing files and malformed JSON anywhere in the error chain are permanent.
pub fn is_transient(error: &anyhow::Error) -> bool {
    !error.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
            || cause.is::<serde_json::Error>()
    })
}

/// Run `operation`, retrying failures accepted by `retryable` per `config`.
///
/// Returns the first success, or the last error once attempts run out or a
/// failure is not retryable.
pub async fn retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    mut retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: FnMut(&E) -> bool,
{
    let mut waits = config.backoff();
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !retryable(&error) {
            debug!("{}: not retrying: {}", operation_name, error);
            return Err(error);
        }

        let Some(wait) = waits.next() else {
            if config.max_attempts > 1 {
                warn!(
                    "{}: giving up after {} attempts: {}",
                    operation_name, config.max_attempts, error
                );
            }
            return Err(error);
        };

        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}",
            operation_name, attempt, config.max_attempts, error, wait
        );
        sleep(wait).await;
        attempt += 1;
    }
}
