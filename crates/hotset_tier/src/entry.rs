// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

/// A value held by the local tier, with the time it was cached.
///
/// # Examples
///
/// ```
/// use hotset_tier::CacheEntry;
/// use std::time::{Duration, Instant};
///
/// let now = Instant::now();
/// let entry = CacheEntry::with_cached_at(42, now);
/// assert_eq!(*entry.value(), 42);
/// assert!(!entry.is_expired(now + Duration::from_secs(10)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Option<Instant>,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates an entry without timestamp or TTL.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: None,
        }
    }

    /// Creates an entry stamped with the time it was cached.
    pub fn with_cached_at(value: V, cached_at: Instant) -> Self {
        Self {
            value,
            cached_at: Some(cached_at),
            ttl: None,
        }
    }

    /// Sets a per-entry TTL, measured from [`cached_at`](Self::cached_at).
    #[must_use]
    pub fn ttl_of(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The cached value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, returning the value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// When the entry was cached, if known.
    #[must_use]
    pub fn cached_at(&self) -> Option<Instant> {
        self.cached_at
    }

    /// Per-entry TTL, if any.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Whether the entry's own TTL has elapsed at `now`.
    ///
    /// Entries without both a timestamp and a TTL never expire on their own; the tier's
    /// policy applies instead.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        match (self.cached_at, self.ttl) {
            (Some(cached_at), Some(ttl)) => now.saturating_duration_since(cached_at) >= ttl,
            _ => false,
        }
    }
}
