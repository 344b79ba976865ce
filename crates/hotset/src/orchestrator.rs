// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use hotset_sketch::HeavyKeeper;
use hotset_tier::{CanonicalStore, LocalTier, SnapshotTier, StoreError};
use tick::{Clock, FutureExt};

use crate::builder::OrchestratorBuilder;
use crate::promotion::{Promotion, PromotionPool, PromotionTarget, Tiers};
use crate::telemetry::timing::timed;
use crate::telemetry::{HotsetActivity, HotsetOperation};

/// Tiered reader that learns which keys are hot.
///
/// Every [`get`](Self::get) records the key in the hot-key detector and then reads through
/// the local tier, the snapshot tier and the canonical store, stopping at the first hit.
/// Values of hot keys found in a slower tier are promoted to the faster tiers by
/// background workers, so the read itself never waits for a promotion.
///
/// Clones share the same tiers, detector and promotion workers.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::time::Duration;
///
/// use hotset::CacheOrchestrator;
/// use hotset_memory::{InMemorySnapshotTier, LocalCache};
/// use hotset_tier::testing::MockStore;
/// use tick::Clock;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), hotset_tier::StoreError> {
/// let clock = Clock::new_tokio();
/// let store = MockStore::with_data(HashMap::from([("post:1".to_string(), 42_u64)]));
///
/// let orchestrator = CacheOrchestrator::builder::<String, u64>(clock.clone())
///     .local(LocalCache::with_capacity(1_000))
///     .snapshot(InMemorySnapshotTier::new(clock))
///     .store(store)
///     .snapshot_timeout(Duration::from_millis(50))
///     .build();
///
/// assert_eq!(orchestrator.get(&"post:1".to_string()).await?, Some(42));
/// assert_eq!(orchestrator.get(&"post:2".to_string()).await?, None);
/// # Ok(())
/// # }
/// ```
pub struct CacheOrchestrator<K, V, L, D, C> {
    inner: Arc<OrchestratorInner<K, V, L, D, C>>,
}

struct OrchestratorInner<K, V, L, D, C> {
    detector: Arc<HeavyKeeper<K>>,
    tiers: Arc<Tiers<L, D>>,
    store: C,
    pool: PromotionPool<K, V>,
    snapshot_timeout: Duration,
}

impl CacheOrchestrator<(), (), (), (), ()> {
    /// Creates a builder. Tiers are supplied through the builder.
    #[must_use]
    pub fn builder<K, V>(clock: Clock) -> OrchestratorBuilder<K, V> {
        OrchestratorBuilder::new(clock)
    }
}

impl<K, V, L, D, C> CacheOrchestrator<K, V, L, D, C>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: LocalTier<K, V> + 'static,
    D: SnapshotTier<K, V> + 'static,
    C: CanonicalStore<K, V>,
{
    pub(crate) fn new(
        detector: Arc<HeavyKeeper<K>>,
        tiers: Tiers<L, D>,
        store: C,
        snapshot_timeout: Duration,
        workers: usize,
        queue_capacity: usize,
    ) -> Self {
        let tiers = Arc::new(tiers);
        let pool = PromotionPool::start(Arc::clone(&tiers), workers, queue_capacity);

        Self {
            inner: Arc::new(OrchestratorInner {
                detector,
                tiers,
                store,
                pool,
                snapshot_timeout,
            }),
        }
    }

    /// Reads `key` through the tiers.
    ///
    /// Snapshot tier failures and timeouts count as misses. `Ok(None)` means the canonical
    /// store has no record for the key.
    ///
    /// # Errors
    ///
    /// Returns the canonical store's error when the key missed both cache tiers and the
    /// store read failed.
    pub async fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        let inner = &*self.inner;
        let tiers = &*inner.tiers;
        let is_hot = inner.detector.add(key);

        let lookup = timed(&tiers.clock, tiers.local.get(key)).await;
        if let Some(entry) = lookup.value {
            tiers
                .telemetry
                .record(tiers.name, HotsetOperation::Get, HotsetActivity::LocalHit, Some(lookup.elapsed));
            return Ok(Some(entry.into_value()));
        }

        if let Some(value) = self.snapshot_get(key).await {
            if is_hot {
                self.promote(key, value.clone(), PromotionTarget::Local);
            }
            return Ok(Some(value));
        }

        let lookup = timed(&tiers.clock, inner.store.get(key)).await;
        match lookup.value {
            Ok(Some(value)) => {
                tiers
                    .telemetry
                    .record(tiers.name, HotsetOperation::Get, HotsetActivity::StoreHit, Some(lookup.elapsed));
                if is_hot {
                    self.promote(key, value.clone(), PromotionTarget::LocalAndSnapshot);
                }
                Ok(Some(value))
            }
            Ok(None) => {
                tiers
                    .telemetry
                    .record(tiers.name, HotsetOperation::Get, HotsetActivity::StoreMiss, Some(lookup.elapsed));
                Ok(None)
            }
            Err(error) => {
                tiers.telemetry.record_failure(
                    tiers.name,
                    HotsetOperation::Get,
                    HotsetActivity::StoreError,
                    Some(lookup.elapsed),
                    &error,
                );
                Err(error)
            }
        }
    }

    /// Removes `key` from the local tier.
    ///
    /// Call after changing the record in the canonical store. Snapshot entries expire on
    /// their own and are rewritten by the next flush.
    pub async fn invalidate(&self, key: &K) {
        self.inner.tiers.local.invalidate(key).await;
    }

    /// The hot-key detector fed by every read.
    #[must_use]
    pub fn detector(&self) -> &Arc<HeavyKeeper<K>> {
        &self.inner.detector
    }

    /// The local tier.
    #[must_use]
    pub fn local(&self) -> &L {
        &self.inner.tiers.local
    }

    /// The snapshot tier.
    #[must_use]
    pub fn snapshot(&self) -> &D {
        &self.inner.tiers.snapshot
    }

    /// Stops accepting promotions and waits for queued ones to be written.
    ///
    /// Reads keep working afterwards; hot values are simply no longer promoted.
    pub async fn shutdown(&self) {
        self.inner.pool.shutdown().await;
    }

    async fn snapshot_get(&self, key: &K) -> Option<V> {
        let tiers = &*self.inner.tiers;

        let lookup = timed(
            &tiers.clock,
            tiers.snapshot.get(key).timeout(&tiers.clock, self.inner.snapshot_timeout),
        )
        .await;

        let (activity, value) = match lookup.value {
            Ok(Ok(Some(value))) => (HotsetActivity::SnapshotHit, Some(value)),
            Ok(Ok(None)) => (HotsetActivity::SnapshotMiss, None),
            Ok(Err(error)) => {
                tiers.telemetry.record_failure(
                    tiers.name,
                    HotsetOperation::Get,
                    HotsetActivity::SnapshotError,
                    Some(lookup.elapsed),
                    &error,
                );
                return None;
            }
            Err(_elapsed) => (HotsetActivity::SnapshotTimeout, None),
        };

        tiers
            .telemetry
            .record(tiers.name, HotsetOperation::Get, activity, Some(lookup.elapsed));
        value
    }

    fn promote(&self, key: &K, value: V, target: PromotionTarget) {
        let tiers = &*self.inner.tiers;
        let promotion = Promotion {
            key: key.clone(),
            value,
            target,
        };

        let activity = if self.inner.pool.submit(promotion) {
            HotsetActivity::PromotionQueued
        } else {
            HotsetActivity::PromotionDropped
        };
        tiers.telemetry.record(tiers.name, HotsetOperation::Promote, activity, None);
    }
}

impl<K, V, L, D, C> Clone for CacheOrchestrator<K, V, L, D, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, L, D, C> Debug for CacheOrchestrator<K, V, L, D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOrchestrator")
            .field("name", &self.inner.tiers.name)
            .field("snapshot_timeout", &self.inner.snapshot_timeout)
            .finish_non_exhaustive()
    }
}
