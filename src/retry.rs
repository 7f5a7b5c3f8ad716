//! Reconnect backoff policy.
//!
//! [`ReconnectPolicy`] computes the wait between consecutive attempts to
//! establish a brand-new session. The delay grows exponentially and is
//! capped, so a long outage produces a steady probe rate instead of a
//! connection storm.

use std::time::Duration;

/// Capped exponential backoff for reconnect attempts.
///
/// Attempt indices `0, 1, 2, …` yield delays of `base^1, base^2, base^3, …`
/// seconds, clamped to `max_delay`. With the default `base = 2` and
/// `max_delay = 64s` that is `2, 4, 8, 16, 32, 64, 64, …`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Exponential base.
    pub base: u32,

    /// Upper bound on the delay.
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a new policy.
    #[must_use]
    pub fn new(base: u32, max_delay: Duration) -> Self {
        Self { base, max_delay }
    }

    /// Returns the delay to wait after the failed attempt with the given
    /// index.
    ///
    /// The index is per reconnect episode: it starts at zero for every new
    /// episode and is never carried across a successful connect.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // exponent is clamped well below i32::MAX
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_add(1).min(63);
        let raw = f64::from(self.base).powi(exponent as i32);
        Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(64))
    }
}
