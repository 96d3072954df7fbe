//! Retry policy for handler execution.

use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// A handler is attempted up to `max_attempts` times; between attempts the
/// loop sleeps `base_delay * 2^attempt` (2s, 4s with the defaults). There is
/// no delay after the final attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
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

impl RetryPolicy {
    /// Delay before the next attempt, given the 1-based attempt that just
    /// failed. Returns `None` once all attempts are used up.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.base_delay * 2u32.saturating_pow(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.backoff(2), Some(Duration::from_secs(4)));
        assert_eq!(policy.backoff(3), None);
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(1), None);
    }
}
