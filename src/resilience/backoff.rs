//! Reconnect backoff.

use std::time::Duration;

use rand::Rng;

/// Capped exponential delay between reconnect attempts, with up to 10%
/// random jitter added so consumers that failed together do not retry
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay before retry number `failures` (1 for the first retry).
    pub fn delay(&self, failures: u32) -> Duration {
        let Some(doublings) = failures.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = 1u32.checked_shl(doublings.min(31)).unwrap_or(u32::MAX);
        let capped = self.base.saturating_mul(factor).min(self.max);

        let spread = capped.as_millis() as u64 / 10;
        if spread == 0 {
            return capped;
        }
        capped + Duration::from_millis(rand::thread_rng().gen_range(0..spread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(d: Duration) -> u128 {
        d.as_millis()
    }

    #[test]
    fn no_failures_means_no_wait() {
        assert_eq!(Backoff::from_millis(100, 5000).delay(0), Duration::ZERO);
    }

    #[test]
    fn doubles_until_capped() {
        let backoff = Backoff::from_millis(100, 5000);

        assert!((100..110).contains(&millis(backoff.delay(1))));
        assert!((400..440).contains(&millis(backoff.delay(3))));
        assert!((5000..5500).contains(&millis(backoff.delay(30))));
        assert!((5000..5500).contains(&millis(backoff.delay(u32::MAX))));
    }

    #[test]
    fn max_below_base_is_raised() {
        let backoff = Backoff::from_millis(200, 50);
        assert!((200..220).contains(&millis(backoff.delay(4))));
    }
}
