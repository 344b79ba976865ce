// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::ConfigError;

/// A key together with the largest estimate observed for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopKItem<K> {
    key: K,
    count: u32,
}

impl<K> TopKItem<K> {
    /// Creates a new item.
    pub fn new(key: K, count: u32) -> Self {
        Self { key, count }
    }

    /// The tracked key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The tracked estimate.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Consumes the item, returning the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

struct TrackerState<K> {
    ranked: BTreeSet<(u32, K)>,
    counts: HashMap<K, u32>,
}

impl<K: Clone + Eq + Hash + Ord> TrackerState<K> {
    fn admit(&mut self, key: K, count: u32) {
        self.ranked.insert((count, key.clone()));
        self.counts.insert(key, count);
    }

    fn raise(&mut self, key: &K, current: u32, count: u32) {
        if count > current {
            self.ranked.remove(&(current, key.clone()));
            self.admit(key.clone(), count);
        }
    }

    fn evict_min(&mut self) {
        if let Some((_, evicted)) = self.ranked.pop_first() {
            self.counts.remove(&evicted);
        }
    }

    fn min_count(&self) -> Option<u32> {
        self.ranked.first().map(|(count, _)| *count)
    }
}

/// Bounded set of the `k` keys with the largest offered estimates.
///
/// A newcomer enters a full tracker only when its count is strictly greater than the
/// current minimum. Among tied minimums the smallest key is the one evicted.
pub struct TopKTracker<K> {
    k: usize,
    state: RwLock<TrackerState<K>>,
}

impl<K> TopKTracker<K>
where
    K: Clone + Eq + Hash + Ord,
{
    /// Creates a tracker holding at most `k` keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `k` is zero.
    pub fn try_new(k: usize) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::for_parameter("k"));
        }

        Ok(Self::new_unchecked(k))
    }

    pub(crate) fn new_unchecked(k: usize) -> Self {
        Self {
            k,
            state: RwLock::new(TrackerState {
                ranked: BTreeSet::new(),
                counts: HashMap::with_capacity(k),
            }),
        }
    }

    /// Offers `key` with its current estimate and reports whether it is tracked afterwards.
    ///
    /// A key that is already tracked keeps the larger of its stored and offered counts, so
    /// a smaller offer never lowers it. The stored count can therefore stay above the
    /// sketch's current estimate for a key that has cooled down.
    pub fn offer(&self, key: &K, count: u32) -> bool {
        let mut state = self.state.write();

        if let Some(&current) = state.counts.get(key) {
            state.raise(key, current, count);
            return true;
        }

        if state.counts.len() < self.k {
            state.admit(key.clone(), count);
            return true;
        }

        match state.min_count() {
            Some(min) if count > min => {
                state.evict_min();
                state.admit(key.clone(), count);
                true
            }
            _ => false,
        }
    }

    /// Returns the tracked keys ordered by count, largest first. Ties are ordered by key,
    /// largest first.
    pub fn snapshot(&self) -> Vec<TopKItem<K>> {
        self.state
            .read()
            .ranked
            .iter()
            .rev()
            .map(|(count, key)| TopKItem::new(key.clone(), *count))
            .collect()
    }

    /// Whether `key` is currently tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.state.read().counts.contains_key(key)
    }

    /// The stored count of `key`, if it is tracked.
    pub fn count_of(&self, key: &K) -> Option<u32> {
        self.state.read().counts.get(key).copied()
    }

    /// Number of tracked keys. Never exceeds [`k`](Self::k).
    pub fn len(&self) -> usize {
        self.state.read().counts.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tracked keys.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Forgets every tracked key.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.ranked.clear();
        state.counts.clear();
    }
}

impl<K> Debug for TopKTracker<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopKTracker")
            .field("k", &self.k)
            .field("len", &self.state.read().counts.len())
            .finish()
    }
}
