//! Coordinator configuration

use crate::backoff::BackoffPolicy;
use crate::error::ConfigError;
use std::time::Duration;

/// Timing and retry settings for one coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before an automatic save fires
    pub debounce: Duration,
    /// Attempts per save cycle, including the first
    pub max_retries: u32,
    /// Delay curve between attempts
    pub backoff: BackoffPolicy,
    /// Upper bound on a single attempt; `None` waits forever
    pub attempt_timeout: Option<Duration>,
}

impl AutosaveConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.attempt_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        self.backoff.validate()
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            attempt_timeout: Some(Self::DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AutosaveConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.debounce, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = AutosaveConfig::default().with_max_retries(0);
        assert_eq!(config.validate(), Err(ConfigError::NoAttempts));
    }

    #[test]
    fn test_zero_timeout_rejected_but_none_allowed() {
        let config = AutosaveConfig::default().with_attempt_timeout(Some(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let config = AutosaveConfig::default().with_attempt_timeout(None);
        assert!(config.validate().is_ok());
    }
}
