//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid [`PipelineConfig`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PipelineConfigError {
    /// `batch.size` is zero.
    #[error("batch size must be positive")]
    ZeroBatchSize,
    /// `batch.intervalMs` is zero.
    #[error("flush interval must be positive")]
    ZeroFlushInterval,
    /// `retry.maxAttempts` is zero.
    #[error("retry max attempts must be at least 1")]
    ZeroMaxAttempts,
    /// `maxBufferSize` is zero.
    #[error("max buffer size must be positive")]
    ZeroBufferSize,
}

impl PipelineConfigError {
    /// Returns the serialized name of the invalid field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::ZeroBatchSize => "batch.size",
            Self::ZeroFlushInterval => "batch.intervalMs",
            Self::ZeroMaxAttempts => "retry.maxAttempts",
            Self::ZeroBufferSize => "maxBufferSize",
        }
    }
}

/// Controls when pending events are flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchConfig {
    /// Number of pending events that triggers a flush.
    pub size: usize,
    /// Maximum time in milliseconds a partial batch waits before it is flushed.
    pub interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 25,
            interval_ms: 2000,
        }
    }
}

/// The delay strategy between attempts to send a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Waits the initial delay between all attempts.
    #[default]
    Fixed,
    /// Doubles the delay after every failed attempt.
    Exponential,
}

/// Controls retries of failed sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total number of attempts per batch, including the first one.
    pub max_attempts: u32,
    /// The delay strategy.
    pub backoff: Backoff,
    /// Base delay in milliseconds.
    pub initial_delay_ms: u64,
}

impl RetryConfig {
    /// Returns the delay after the given failed attempt, starting at `1`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use evlog_drain::{Backoff, RetryConfig};
    ///
    /// let retry = RetryConfig {
    ///     backoff: Backoff::Exponential,
    ///     ..RetryConfig::default()
    /// };
    ///
    /// assert_eq!(retry.delay(1), Duration::from_millis(500));
    /// assert_eq!(retry.delay(2), Duration::from_millis(1000));
    /// assert_eq!(retry.delay(3), Duration::from_millis(2000));
    /// ```
    pub fn delay(&self, attempt: u32) -> Duration {
        let millis = match self.backoff {
            Backoff::Fixed => self.initial_delay_ms,
            Backoff::Exponential => {
                let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
                self.initial_delay_ms.saturating_mul(factor)
            }
        };

        Duration::from_millis(millis)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::Fixed,
            initial_delay_ms: 500,
        }
    }
}

/// Configuration of a [`Pipeline`](crate::Pipeline).
///
/// All fields have defaults, so an empty mapping is a valid configuration:
///
/// ```yaml
/// batch:
///   size: 25
///   intervalMs: 2000
/// retry:
///   maxAttempts: 2
///   backoff: fixed
///   initialDelayMs: 500
/// maxBufferSize: 1000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Flush triggers.
    pub batch: BatchConfig,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Hard cap on buffered events that have not been handed to the sink.
    pub max_buffer_size: usize,
}

impl PipelineConfig {
    /// Returns the interval after which a partial batch is flushed.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.batch.interval_ms)
    }

    /// Checks that all sizes and counts are positive.
    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.batch.size == 0 {
            return Err(PipelineConfigError::ZeroBatchSize);
        }
        if self.batch.interval_ms == 0 {
            return Err(PipelineConfigError::ZeroFlushInterval);
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineConfigError::ZeroMaxAttempts);
        }
        if self.max_buffer_size == 0 {
            return Err(PipelineConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Replaces every zero size or count with its default, so the result always validates.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.batch.size == 0 {
            self.batch.size = defaults.batch.size;
        }
        if self.batch.interval_ms == 0 {
            self.batch.interval_ms = defaults.batch.interval_ms;
        }
        if self.retry.max_attempts == 0 {
            self.retry.max_attempts = defaults.retry.max_attempts;
        }
        if self.max_buffer_size == 0 {
            self.max_buffer_size = defaults.max_buffer_size;
        }
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            max_buffer_size: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.batch.size, 25);
        assert_eq!(config.flush_interval(), Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.backoff, Backoff::Fixed);
        assert_eq!(config.retry.initial_delay_ms, 500);
        assert_eq!(config.max_buffer_size, 1000);
    }

    #[test]
    fn test_partial_yaml() {
        let config: PipelineConfig = serde_yaml::from_str(
            r#"
batch:
  size: 50
retry:
  backoff: exponential
maxBufferSize: 200
"#,
        )
        .unwrap();

        assert_eq!(config.batch.size, 50);
        assert_eq!(config.batch.interval_ms, 2000);
        assert_eq!(config.retry.backoff, Backoff::Exponential);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.max_buffer_size, 200);
    }

    #[test]
    fn test_fixed_delay() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay(1), Duration::from_millis(500));
        assert_eq!(retry.delay(5), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_delay_saturates() {
        let retry = RetryConfig {
            backoff: Backoff::Exponential,
            initial_delay_ms: 500,
            ..Default::default()
        };
        assert_eq!(retry.delay(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_validate() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));

        let mut config = PipelineConfig::default();
        config.batch.size = 0;
        assert_eq!(config.validate(), Err(PipelineConfigError::ZeroBatchSize));

        let mut config = PipelineConfig::default();
        config.retry.max_attempts = 0;
        assert_eq!(config.validate(), Err(PipelineConfigError::ZeroMaxAttempts));

        let mut config = PipelineConfig::default();
        config.max_buffer_size = 0;
        assert_eq!(config.validate(), Err(PipelineConfigError::ZeroBufferSize));
    }

    #[test]
    fn test_sanitized_keeps_valid_values() {
        let mut config = PipelineConfig::default();
        config.batch.size = 0;
        config.batch.interval_ms = 500;
        config.retry.max_attempts = 0;
        config.max_buffer_size = 10;

        let config = config.sanitized();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.batch.size, 25);
        assert_eq!(config.batch.interval_ms, 500);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.max_buffer_size, 10);
    }
}
