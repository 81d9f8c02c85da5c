//! Bounded retry with a fixed delay between attempts.

use std::time::Duration;

/// At most `max_retries` retries after the first call, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Delay before retrying after the `attempt`-th failed call (1-based),
    /// or `None` once the retries are used up.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt > 0 && attempt <= self.max_retries).then_some(self.delay)
    }
}

/// `Duration` as whole milliseconds on the wire.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_stop_after_max() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1_000));
        for attempt in 1..=3 {
            assert_eq!(policy.next_delay(attempt), Some(Duration::from_millis(1_000)));
        }
        assert_eq!(policy.next_delay(4), None);
    }

    #[test]
    fn no_retries_means_single_attempt() {
        let policy = RetryPolicy::fixed(0, Duration::from_millis(500));
        assert_eq!(policy.next_delay(1), None);
    }
}
