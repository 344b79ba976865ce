// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use crate::LocalCache;

/// Builder for [`LocalCache`].
///
/// Without any settings the cache is unbounded and entries never expire.
///
/// # Examples
///
/// ```
/// use hotset_memory::LocalCacheBuilder;
/// use std::time::Duration;
///
/// let cache = LocalCacheBuilder::<String, i32>::new()
///     .max_capacity(1000)
///     .time_to_live(Duration::from_secs(300))
///     .name("hot-posts")
///     .build();
/// ```
#[derive(Debug)]
pub struct LocalCacheBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for LocalCacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LocalCacheBuilder<K, V> {
    /// Creates a builder with no limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Maximum number of entries. Inserting beyond it evicts.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Number of entries to pre-allocate.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// How long an entry lives after it was written.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Name used by moka in its own diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> LocalCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        LocalCache::from_builder(&self)
    }
}
