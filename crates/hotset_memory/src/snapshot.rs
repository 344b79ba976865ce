// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hotset_tier::{Result, SnapshotTier, TtlJitter};
use parking_lot::RwLock;
use tick::Clock;

#[derive(Debug)]
struct Stored<V> {
    value: V,
    // `None` when the deadline does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl<V> Stored<V> {
    fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

const MIN_SWEEP_LEN: usize = 64;

struct Entries<K, V> {
    map: HashMap<K, Stored<V>>,
    // Map length at which the next single insert sweeps out expired entries.
    sweep_at: usize,
}

impl<K: Eq + Hash, V> Entries<K, V> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: MIN_SWEEP_LEN,
        }
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, stored| stored.is_live(now));
        self.sweep_at = self.map.len().saturating_mul(2).max(MIN_SWEEP_LEN);
        before - self.map.len()
    }

    fn sweep_if_due(&mut self, now: Instant) {
        if self.map.len() >= self.sweep_at {
            self.sweep(now);
        }
    }
}

/// A [`SnapshotTier`] kept in process memory.
///
/// Expiry is driven by the supplied [`Clock`]. Expired entries are hidden from reads
/// immediately. Every batch insert reclaims them, and single inserts do so whenever the map
/// has doubled since the last sweep, so storage stays proportional to the live entries.
/// [`purge_expired`](Self::purge_expired) reclaims them on demand.
/// A batch insert takes the write lock once, so readers observe either none or all of it.
/// Clones share the same storage.
///
/// # Examples
///
/// ```
/// use hotset_memory::InMemorySnapshotTier;
/// use hotset_tier::SnapshotTier;
/// use std::time::Duration;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let tier = InMemorySnapshotTier::new(Clock::new_frozen());
/// tier.insert(&"post:1".to_string(), 17_u64, Duration::from_secs(600)).await?;
/// assert_eq!(tier.get(&"post:1".to_string()).await?, Some(17));
/// # Ok::<(), hotset_tier::Error>(())
/// # }).unwrap();
/// ```
pub struct InMemorySnapshotTier<K, V> {
    entries: Arc<RwLock<Entries<K, V>>>,
    clock: Clock,
}

impl<K, V> Clone for InMemorySnapshotTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: self.clock.clone(),
        }
    }
}

impl<K, V> Debug for InMemorySnapshotTier<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySnapshotTier")
            .field("entries", &self.entries.read().map.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> InMemorySnapshotTier<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty tier whose entries expire according to `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::new())),
            clock,
        }
    }

    /// Number of entries that have not expired.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.instant();
        self.entries.read().map.values().filter(|stored| stored.is_live(now)).count()
    }

    /// Whether no unexpired entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.entries.write().sweep(self.clock.instant())
    }
}

impl<K, V> SnapshotTier<K, V> for InMemorySnapshotTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        let now = self.clock.instant();
        Ok(self
            .entries
            .read()
            .map
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone()))
    }

    async fn insert(&self, key: &K, value: V, ttl: Duration) -> Result<()> {
        let now = self.clock.instant();
        let mut entries = self.entries.write();
        entries.sweep_if_due(now);
        entries.map.insert(key.clone(), Stored::new(value, now, ttl));
        Ok(())
    }

    async fn batch_insert(&self, entries: HashMap<K, V>, ttl: TtlJitter) -> Result<()> {
        let now = self.clock.instant();
        let prepared: Vec<(K, Stored<V>)> = entries
            .into_iter()
            .map(|(key, value)| (key, Stored::new(value, now, ttl.sample())))
            .collect();

        let mut entries = self.entries.write();
        entries.sweep(now);
        entries.map.extend(prepared);
        Ok(())
    }
}
