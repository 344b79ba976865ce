// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Background promotion of hot values into the faster tiers.
//!
//! Reads hand promotions to a bounded queue drained by a fixed set of tokio workers. When
//! the queue is full the new promotion is dropped, so a read never waits on a promotion.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use hotset_tier::{CacheEntry, LocalTier, SnapshotTier, TtlJitter};
use parking_lot::{Mutex, RwLock};
use tick::{Clock, FutureExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::telemetry::timing::timed;
use crate::telemetry::{HotsetActivity, HotsetName, HotsetOperation, HotsetTelemetry};

/// Which tiers a promotion writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromotionTarget {
    /// Found in the snapshot tier; only the local tier is behind.
    Local,
    /// Found in the canonical store; both faster tiers are behind.
    LocalAndSnapshot,
}

#[derive(Debug)]
pub(crate) struct Promotion<K, V> {
    pub key: K,
    pub value: V,
    pub target: PromotionTarget,
}

/// The two cache tiers together with what is needed to write to them.
#[derive(Debug)]
pub(crate) struct Tiers<L, D> {
    pub local: L,
    pub snapshot: D,
    pub snapshot_ttl: TtlJitter,
    /// Bounds each snapshot write so a hung tier cannot hold a worker.
    pub write_timeout: Duration,
    pub clock: Clock,
    pub telemetry: HotsetTelemetry,
    pub name: HotsetName,
}

impl<L, D> Tiers<L, D> {
    pub(crate) async fn promote<K, V>(&self, promotion: Promotion<K, V>)
    where
        L: LocalTier<K, V>,
        D: SnapshotTier<K, V>,
        V: Clone,
    {
        let Promotion { key, value, target } = promotion;

        let write = timed(&self.clock, async {
            let entry = CacheEntry::with_cached_at(value.clone(), self.clock.instant());
            self.local.insert(&key, entry).await;

            match target {
                PromotionTarget::Local => Ok(Ok(())),
                PromotionTarget::LocalAndSnapshot => {
                    self.snapshot
                        .insert(&key, value, self.snapshot_ttl.sample())
                        .timeout(&self.clock, self.write_timeout)
                        .await
                }
            }
        })
        .await;

        match write.value {
            Ok(Ok(())) => self.telemetry.record(
                self.name,
                HotsetOperation::Promote,
                HotsetActivity::PromotionWritten,
                Some(write.elapsed),
            ),
            Ok(Err(error)) => self.record_failure(write.elapsed, &error),
            Err(error) => self.record_failure(write.elapsed, &error),
        }
    }

    fn record_failure(&self, elapsed: Duration, reason: &dyn Display) {
        self.telemetry.record_failure(
            self.name,
            HotsetOperation::Promote,
            HotsetActivity::PromotionFailed,
            Some(elapsed),
            reason,
        );
    }
}

/// Bounded queue plus the workers draining it.
#[derive(Debug)]
pub(crate) struct PromotionPool<K, V> {
    sender: RwLock<Option<mpsc::Sender<Promotion<K, V>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<K, V> PromotionPool<K, V>
where
    K: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawns `workers` tasks on the current tokio runtime. Zero sizes are raised to one.
    pub(crate) fn start<L, D>(tiers: Arc<Tiers<L, D>>, workers: usize, capacity: usize) -> Self
    where
        L: LocalTier<K, V> + 'static,
        D: SnapshotTier<K, V> + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|_| {
                let tiers = Arc::clone(&tiers);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    while let Some(promotion) = next(&receiver).await {
                        tiers.promote(promotion).await;
                    }
                })
            })
            .collect();

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Queues a promotion. Returns `false` if the queue is full or closed.
    pub(crate) fn submit(&self, promotion: Promotion<K, V>) -> bool {
        self.sender
            .read()
            .as_ref()
            .is_some_and(|sender| sender.try_send(promotion).is_ok())
    }

    /// Closes the queue and waits until the workers have drained it.
    pub(crate) async fn shutdown(&self) {
        drop(self.sender.write().take());

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(error = %error, "promotion worker terminated abnormally");
            }
        }
    }
}

async fn next<T>(receiver: &tokio::sync::Mutex<mpsc::Receiver<T>>) -> Option<T> {
    receiver.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use hotset_memory::LocalCache;
    use hotset_tier::testing::{MockSnapshotTier, SnapshotOp};
    use tick::ClockControl;

    use super::*;

    type TestTiers = Tiers<LocalCache<String, u32>, MockSnapshotTier<String, u32>>;

    fn tiers() -> Arc<TestTiers> {
        tiers_with(Clock::new_frozen())
    }

    fn tiers_with(clock: Clock) -> Arc<TestTiers> {
        Arc::new(Tiers {
            local: LocalCache::with_capacity(16),
            snapshot: MockSnapshotTier::new(),
            snapshot_ttl: TtlJitter::fixed(Duration::from_secs(30)),
            write_timeout: Duration::from_secs(1),
            clock,
            telemetry: HotsetTelemetry::default(),
            name: "test",
        })
    }

    fn promotion(key: &str, target: PromotionTarget) -> Promotion<String, u32> {
        Promotion {
            key: key.to_string(),
            value: 7,
            target,
        }
    }

    #[tokio::test]
    async fn local_target_skips_snapshot() {
        let tiers = tiers();
        tiers.promote(promotion("a", PromotionTarget::Local)).await;

        assert!(tiers.local.get(&"a".to_string()).await.is_some());
        assert!(tiers.snapshot.operations().is_empty());
    }

    #[tokio::test]
    async fn snapshot_target_writes_with_ttl() {
        let tiers = tiers();
        tiers.promote(promotion("a", PromotionTarget::LocalAndSnapshot)).await;

        assert!(tiers.local.get(&"a".to_string()).await.is_some());
        assert_eq!(tiers.snapshot.ttl_of(&"a".to_string()), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn snapshot_failure_keeps_local_write() {
        let tiers = tiers();
        tiers.snapshot.fail_when(|op| matches!(op, SnapshotOp::Insert { .. }));

        tiers.promote(promotion("a", PromotionTarget::LocalAndSnapshot)).await;

        assert!(tiers.local.get(&"a".to_string()).await.is_some());
        assert_eq!(tiers.snapshot.entry_count(), 0);
    }

    #[tokio::test]
    async fn stalled_snapshot_write_times_out() {
        let tiers = tiers_with(ClockControl::new().auto_advance_timers(true).to_clock());
        tiers.snapshot.stall_when(|op| matches!(op, SnapshotOp::Insert { .. }));

        tiers.promote(promotion("a", PromotionTarget::LocalAndSnapshot)).await;

        assert!(tiers.local.get(&"a".to_string()).await.is_some());
        assert_eq!(tiers.snapshot.entry_count(), 0);
    }

    #[tokio::test]
    async fn stalled_snapshot_does_not_hold_worker() {
        let tiers = tiers_with(ClockControl::new().auto_advance_timers(true).to_clock());
        tiers.snapshot.stall_when(|op| matches!(op, SnapshotOp::Insert { .. }));
        let pool = PromotionPool::start(Arc::clone(&tiers), 1, 8);

        assert!(pool.submit(promotion("a", PromotionTarget::LocalAndSnapshot)));
        assert!(pool.submit(promotion("b", PromotionTarget::Local)));
        pool.shutdown().await;

        assert!(tiers.local.get(&"b".to_string()).await.is_some());
        assert_eq!(tiers.snapshot.entry_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_queue() {
        let tiers = tiers();
        let pool = PromotionPool::start(Arc::clone(&tiers), 2, 8);

        for key in ["a", "b", "c"] {
            assert!(pool.submit(promotion(key, PromotionTarget::Local)));
        }
        pool.shutdown().await;

        for key in ["a", "b", "c"] {
            assert!(tiers.local.get(&key.to_string()).await.is_some(), "{key} not promoted");
        }
        assert!(!pool.submit(promotion("d", PromotionTarget::Local)));
    }

    #[tokio::test]
    async fn full_queue_rejects_newest() {
        let tiers = tiers();
        tiers.snapshot.stall_when(|_| true);
        let pool = PromotionPool::start(Arc::clone(&tiers), 1, 1);

        // The single worker picks this up and stalls on the snapshot write.
        assert!(pool.submit(promotion("stuck", PromotionTarget::LocalAndSnapshot)));
        while tiers.snapshot.operations().is_empty() {
            tokio::task::yield_now().await;
        }

        assert!(pool.submit(promotion("queued", PromotionTarget::Local)));
        assert!(!pool.submit(promotion("rejected", PromotionTarget::Local)));
    }
}
