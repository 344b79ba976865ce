// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// A TTL with random jitter.
///
/// Each call to [`sample`](Self::sample) yields `base + r` where `r` is drawn uniformly
/// from `[0, max_jitter)` at millisecond resolution.
///
/// # Examples
///
/// ```
/// use hotset_tier::TtlJitter;
/// use std::time::Duration;
///
/// let ttl = TtlJitter::new(Duration::from_secs(600), Duration::from_secs(120));
/// let sampled = ttl.sample();
/// assert!(sampled >= Duration::from_secs(600));
/// assert!(sampled < Duration::from_secs(720));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TtlJitter {
    base: Duration,
    max_jitter: Duration,
}

impl TtlJitter {
    /// Creates a jittered TTL.
    #[must_use]
    pub const fn new(base: Duration, max_jitter: Duration) -> Self {
        Self { base, max_jitter }
    }

    /// A TTL without jitter.
    #[must_use]
    pub const fn fixed(ttl: Duration) -> Self {
        Self::new(ttl, Duration::ZERO)
    }

    /// Lower bound of every sample.
    #[must_use]
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Exclusive upper bound of the added jitter.
    #[must_use]
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Draws a TTL.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let window = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if window == 0 {
            return self.base;
        }

        self.base.saturating_add(Duration::from_millis(fastrand::u64(..window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_never_varies() {
        let ttl = TtlJitter::fixed(Duration::from_secs(3));
        assert_eq!(ttl.max_jitter(), Duration::ZERO);
        for _ in 0..100 {
            assert_eq!(ttl.sample(), Duration::from_secs(3));
        }
    }

    #[test]
    fn samples_stay_in_window() {
        let ttl = TtlJitter::new(Duration::from_secs(600), Duration::from_secs(120));
        for _ in 0..1_000 {
            let sampled = ttl.sample();
            assert!(sampled >= ttl.base());
            assert!(sampled < ttl.base() + ttl.max_jitter());
        }
    }

    #[test]
    fn sub_millisecond_jitter_is_ignored() {
        let ttl = TtlJitter::new(Duration::from_secs(1), Duration::from_micros(500));
        assert_eq!(ttl.sample(), Duration::from_secs(1));
    }
}
