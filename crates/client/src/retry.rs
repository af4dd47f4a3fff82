use std::time::Duration;

/// Exponential backoff schedule for the dispatcher's retry loop.
///
/// Distinct from [`crate::middleware::with_retry`]'s linear policy; the two
/// are intentionally separate primitives and must not be unified.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(backoff_base: Duration, backoff_max: Duration) -> Self {
        Self { backoff_base, backoff_max }
    }

    /// Delay before the retry following failed attempt `attempt_index`
    /// (zero-based): `base * 2^attempt_index`, capped.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt_index.min(32));
        let ms = (self.backoff_base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(ms.min(self.backoff_max.as_millis() as u64))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        // ridiculous attempt numbers must not overflow
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(30));
    }
}
