//! Delay between failed save attempts

use crate::error::ConfigError;
use std::time::Duration;

/// Floor applied to every delay so retries never spin
pub const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Backoff curve between attempts of one save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(250),
            max: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the given retry (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let delay = match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let shift = retry.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(max)
            }
        };
        delay.max(MIN_BACKOFF)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Fixed(_) => Ok(()),
            Self::Exponential { base, max } if base > max => {
                Err(ConfigError::BackoffRange { base, max })
            }
            Self::Exponential { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_doubles_then_caps() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };

        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_millis(500));
        assert_eq!(policy.delay(40), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_delay_is_floored() {
        assert_eq!(BackoffPolicy::Fixed(Duration::ZERO).delay(1), MIN_BACKOFF);

        let policy = BackoffPolicy::Exponential {
            base: Duration::ZERO,
            max: Duration::ZERO,
        };
        assert_eq!(policy.delay(3), MIN_BACKOFF);
    }

    #[test]
    fn test_fixed_ignores_retry_number() {
        let policy = BackoffPolicy::Fixed(Duration::from_millis(300));
        assert_eq!(policy.delay(1), policy.delay(7));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_secs(2),
            max: Duration::from_secs(1),
        };
        assert!(policy.validate().is_err());
        assert!(BackoffPolicy::default().validate().is_ok());
    }
}
