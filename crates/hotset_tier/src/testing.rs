// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recording test doubles for the snapshot tier and the canonical store.
//!
//! Both doubles keep their data in memory, log every call and can be told to fail or to
//! stall (never complete) for selected calls.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{CanonicalStore, Error, Result, SnapshotTier, StoreError, TtlJitter};

type Predicate<Op> = Box<dyn Fn(&Op) -> bool + Send + Sync>;

struct Behavior<Op> {
    fail_when: Mutex<Option<Predicate<Op>>>,
    stall_when: Mutex<Option<Predicate<Op>>>,
    operations: Mutex<Vec<Op>>,
}

impl<Op: Clone> Behavior<Op> {
    fn new() -> Self {
        Self {
            fail_when: Mutex::new(None),
            stall_when: Mutex::new(None),
            operations: Mutex::new(Vec::new()),
        }
    }

    /// Records `op` and reports whether it should fail. Stalls forever if configured to.
    async fn enter(&self, op: Op) -> bool {
        let stall = self.stall_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);

        if stall {
            std::future::pending::<()>().await;
        }

        fail
    }
}

/// Recorded snapshot tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOp<K, V> {
    /// A get with the given key.
    Get(K),
    /// A single insert.
    Insert {
        /// The inserted key.
        key: K,
        /// The inserted value.
        value: V,
        /// The TTL passed by the caller.
        ttl: Duration,
    },
    /// A batch insert.
    BatchInsert {
        /// The keys in the batch, in no particular order.
        keys: Vec<K>,
        /// The TTL policy passed by the caller.
        ttl: TtlJitter,
    },
}

/// In-memory [`SnapshotTier`] that records calls and supports failure injection.
///
/// Stored values never expire; the TTL given on write is kept for inspection through
/// [`ttl_of`](Self::ttl_of).
///
/// # Examples
///
/// ```no_run
/// use hotset_tier::testing::{MockSnapshotTier, SnapshotOp};
/// use hotset_tier::SnapshotTier;
///
/// # async fn example() {
/// let tier = MockSnapshotTier::<String, i32>::new();
/// tier.fail_when(|op| matches!(op, SnapshotOp::Get(_)));
/// assert!(tier.get(&"key".to_string()).await.is_err());
/// # }
/// ```
pub struct MockSnapshotTier<K, V> {
    data: Arc<Mutex<HashMap<K, (V, Duration)>>>,
    behavior: Arc<Behavior<SnapshotOp<K, V>>>,
}

impl<K, V> Clone for MockSnapshotTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            behavior: Arc::clone(&self.behavior),
        }
    }
}

impl<K, V> Debug for MockSnapshotTier<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSnapshotTier")
            .field("entries", &self.data.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for MockSnapshotTier<K, V>
where
    K: Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockSnapshotTier<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            behavior: Arc::new(Behavior::new()),
        }
    }

    /// Makes operations matching `predicate` fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&SnapshotOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.behavior.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Makes operations matching `predicate` never complete.
    pub fn stall_when<F>(&self, predicate: F)
    where
        F: Fn(&SnapshotOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.behavior.stall_when.lock() = Some(Box::new(predicate));
    }

    /// Removes any failure or stall predicate.
    pub fn clear_failures(&self) {
        *self.behavior.fail_when.lock() = None;
        *self.behavior.stall_when.lock() = None;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<SnapshotOp<K, V>> {
        self.behavior.operations.lock().clone()
    }

    /// Number of stored values.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }
}

impl<K, V> MockSnapshotTier<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Stores `value` directly, bypassing the operation log.
    pub fn seed(&self, key: K, value: V, ttl: Duration) {
        self.data.lock().insert(key, (value, ttl));
    }

    /// The stored value for `key`.
    #[must_use]
    pub fn value_of(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).map(|(value, _)| value.clone())
    }

    /// The TTL `key` was written with.
    #[must_use]
    pub fn ttl_of(&self, key: &K) -> Option<Duration> {
        self.data.lock().get(key).map(|(_, ttl)| *ttl)
    }
}

impl<K, V> SnapshotTier<K, V> for MockSnapshotTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        if self.behavior.enter(SnapshotOp::Get(key.clone())).await {
            return Err(Error::from_message("mock: snapshot get failed"));
        }

        Ok(self.value_of(key))
    }

    async fn insert(&self, key: &K, value: V, ttl: Duration) -> Result<()> {
        let op = SnapshotOp::Insert {
            key: key.clone(),
            value: value.clone(),
            ttl,
        };
        if self.behavior.enter(op).await {
            return Err(Error::from_message("mock: snapshot insert failed"));
        }

        self.data.lock().insert(key.clone(), (value, ttl));
        Ok(())
    }

    async fn batch_insert(&self, entries: HashMap<K, V>, ttl: TtlJitter) -> Result<()> {
        let op = SnapshotOp::BatchInsert {
            keys: entries.keys().cloned().collect(),
            ttl,
        };
        if self.behavior.enter(op).await {
            return Err(Error::from_message("mock: snapshot batch insert failed"));
        }

        let mut data = self.data.lock();
        for (key, value) in entries {
            data.insert(key, (value, ttl.sample()));
        }
        Ok(())
    }
}

/// Recorded canonical store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<K> {
    /// A single read.
    Get(K),
    /// A batch read with the requested keys.
    BatchGet(Vec<K>),
}

/// In-memory [`CanonicalStore`] that records calls and supports failure injection.
pub struct MockStore<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    behavior: Arc<Behavior<StoreOp<K>>>,
}

impl<K, V> Clone for MockStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            behavior: Arc::clone(&self.behavior),
        }
    }
}

impl<K, V> Debug for MockStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("records", &self.data.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K: Clone, V> Default for MockStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V> MockStore<K, V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Creates a store holding `data`.
    #[must_use]
    pub fn with_data(data: HashMap<K, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            behavior: Arc::new(Behavior::new()),
        }
    }

    /// Makes operations matching `predicate` fail with [`StoreError::unavailable`].
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<K>) -> bool + Send + Sync + 'static,
    {
        *self.behavior.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Makes operations matching `predicate` never complete.
    pub fn stall_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<K>) -> bool + Send + Sync + 'static,
    {
        *self.behavior.stall_when.lock() = Some(Box::new(predicate));
    }

    /// Removes any failure or stall predicate.
    pub fn clear_failures(&self) {
        *self.behavior.fail_when.lock() = None;
        *self.behavior.stall_when.lock() = None;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<K>> {
        self.behavior.operations.lock().clone()
    }
}

impl<K: Eq + Hash, V> MockStore<K, V> {
    /// Adds or replaces a record.
    pub fn put(&self, key: K, value: V) {
        self.data.lock().insert(key, value);
    }

    /// Deletes a record.
    pub fn remove(&self, key: &K) {
        self.data.lock().remove(key);
    }
}

impl<K, V> CanonicalStore<K, V> for MockStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> std::result::Result<Option<V>, StoreError> {
        if self.behavior.enter(StoreOp::Get(key.clone())).await {
            return Err(StoreError::unavailable("mock: store get failed"));
        }

        Ok(self.data.lock().get(key).cloned())
    }

    async fn batch_get(&self, keys: &[K]) -> std::result::Result<HashMap<K, V>, StoreError> {
        if self.behavior.enter(StoreOp::BatchGet(keys.to_vec())).await {
            return Err(StoreError::unavailable("mock: store batch get failed"));
        }

        let data = self.data.lock();
        Ok(keys
            .iter()
            .filter_map(|key| data.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }
}
