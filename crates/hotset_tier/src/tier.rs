// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Traits implemented by the storage tiers.

use std::collections::HashMap;
use std::time::Duration;

use crate::{CacheEntry, Result, StoreError, TtlJitter};

/// The in-process tier consulted first on every read.
///
/// Operations are infallible: a local cache either has the entry or it does not.
pub trait LocalTier<K, V>: Send + Sync {
    /// Looks up an entry.
    fn get(&self, key: &K) -> impl Future<Output = Option<CacheEntry<V>>> + Send;

    /// Inserts or replaces an entry.
    fn insert(&self, key: &K, entry: CacheEntry<V>) -> impl Future<Output = ()> + Send;

    /// Removes an entry.
    fn invalidate(&self, key: &K) -> impl Future<Output = ()> + Send;

    /// Returns the number of entries, if supported.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries.
    ///
    /// Returns `None` for implementations that don't track size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

/// The shared tier holding snapshots of hot values.
///
/// Every write carries a TTL. Reads may fail; callers treat failures as misses.
pub trait SnapshotTier<K, V>: Send + Sync {
    /// Looks up a value.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>>> + Send;

    /// Writes a single value that expires after `ttl`.
    fn insert(&self, key: &K, value: V, ttl: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Writes a batch of values as one unit.
    ///
    /// Implementations must make the whole batch visible at once or not at all. Each entry
    /// gets its own TTL drawn from `ttl`.
    fn batch_insert(&self, entries: HashMap<K, V>, ttl: TtlJitter) -> impl Future<Output = Result<()>> + Send;
}

/// The system of record.
pub trait CanonicalStore<K, V>: Send + Sync {
    /// Reads one record. `Ok(None)` means the record does not exist.
    fn get(&self, key: &K) -> impl Future<Output = std::result::Result<Option<V>, StoreError>> + Send;

    /// Reads many records. Keys without a record are absent from the returned map.
    fn batch_get(&self, keys: &[K]) -> impl Future<Output = std::result::Result<HashMap<K, V>, StoreError>> + Send;
}
