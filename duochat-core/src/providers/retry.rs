//! Retry policy with exponential backoff
//!
//! Retryability is decided purely by the failure classification; the
//! policy itself only bounds the number of attempts and spaces them out.

use crate::config::RetryConfig;
use crate::providers::adapter::Classification;
use std::time::Duration;

/// Per-provider retry behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per provider, including the first one
    pub max_attempts: u32,

    /// Attempt `n` (n >= 1) waits `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default 1s base
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Create a policy with a single attempt
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Override the base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Whether the attempt that just produced `classification` should be
    /// followed by another one. Only retryable failures qualify, and only
    /// while the attempt budget lasts.
    pub fn should_retry(&self, attempt: u32, classification: &Classification) -> bool {
        classification.is_retryable() && attempt + 1 < self.max_attempts
    }

    /// Delay to wait before the attempt with the given zero-based index
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}
