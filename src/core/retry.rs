use std::time::Duration;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// How often an actor step is attempted, and how long it waits in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    limit: usize,
    base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: 1,
            base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// `limit` is the total number of attempts; 0 is treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn attempts(&self) -> usize {
        self.limit.max(1)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Delay after the failed attempt `attempt` (0-based), or `None` after the last one.
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        if attempt.saturating_add(1) >= self.attempts() {
            return None;
        }
        let shift = u32::try_from(attempt).unwrap_or(u32::MAX);
        let factor = 1u32.checked_shl(shift).unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_means_one_attempt() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.delay_after(0), None);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4);
        assert_eq!(policy.delay_after(0), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn test_custom_base() {
        let policy = RetryPolicy::new(3).with_backoff(Duration::from_millis(10));
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_large_attempt_saturates() {
        let policy = RetryPolicy::new(usize::MAX);
        assert!(policy.delay_after(40).is_some());
    }

    #[test]
    fn test_huge_attempt_numbers_do_not_wrap() {
        let policy = RetryPolicy::new(usize::MAX).with_backoff(Duration::from_millis(1));
        assert_eq!(policy.delay_after(usize::MAX), None);
        assert_eq!(policy.delay_after(usize::MAX - 1), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_attempt_beyond_u32_saturates() {
        let policy = RetryPolicy::new(usize::MAX).with_backoff(Duration::from_millis(1));
        // 2^32 + 1 must not shift by 1
        let attempt = (1usize << 32) + 1;
        assert_eq!(
            policy.delay_after(attempt),
            Some(Duration::from_millis(1).saturating_mul(u32::MAX))
        );
    }
}
