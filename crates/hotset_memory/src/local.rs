// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hash::Hash;

use hotset_tier::{CacheEntry, LocalTier};
use moka::future::Cache;

use crate::LocalCacheBuilder;

/// The in-process tier, backed by moka.
///
/// Clones share the same storage.
///
/// # Examples
///
/// ```
/// use hotset_memory::LocalCache;
/// use hotset_tier::{CacheEntry, LocalTier};
/// # futures::executor::block_on(async {
///
/// let cache = LocalCache::<String, i32>::with_capacity(100);
///
/// cache.insert(&"key".to_string(), CacheEntry::new(42)).await;
/// let value = cache.get(&"key".to_string()).await;
/// assert_eq!(*value.unwrap().value(), 42);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LocalCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, CacheEntry<V>>,
}

impl<K, V> LocalCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> LocalCacheBuilder<K, V> {
        LocalCacheBuilder::new()
    }

    pub(crate) fn from_builder(builder: &LocalCacheBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
        }
    }

    /// Applies pending evictions so that [`len`](LocalTier::len) is exact.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl<K, V> LocalTier<K, V> for LocalCache<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.inner.get(key).await
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) {
        self.inner.insert(key.clone(), entry).await;
    }

    async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
