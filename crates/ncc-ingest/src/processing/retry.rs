//! Retry classification and linear backoff for provider calls

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Whether a failed call is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Rate limiting or a dropped connection
    Transient,
    /// Anything else
    Fatal,
}

/// Classify an error without inspecting provider-specific message text
/// beyond the documented quota status
pub fn classify(err: &Error) -> Retryability {
    match err {
        Error::EmbeddingStatus { status, message } => {
            if *status == 429 || message.contains("RESOURCE_EXHAUSTED") {
                Retryability::Transient
            } else {
                Retryability::Fatal
            }
        }
        Error::Http(e) if e.is_connect() || e.is_timeout() || is_connection_reset(e) => {
            Retryability::Transient
        }
        Error::Io(e) if is_reset_kind(e.kind()) => Retryability::Transient,
        _ => Retryability::Fatal,
    }
}

fn is_reset_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}

fn is_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if is_reset_kind(io_err.kind()) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Bounded retry with a wait that grows by a fixed step per attempt
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_step: Duration,
}

impl RetryPolicy {
    /// Create a new policy
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Create from retry configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_secs(config.backoff_step_secs))
    }

    /// Total attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failed attempt with zero-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }

    /// Run an operation, repeating it after transient failures
    pub async fn run<F, Fut, T>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let retryable = classify(&e) == Retryability::Transient;
                    if !retryable || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, waiting {:?}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
