// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use hotset_sketch::HeavyKeeper;
use hotset_tier::{CanonicalStore, LocalTier, SnapshotTier, TtlJitter};
use tick::Clock;

use crate::promotion::Tiers;
use crate::telemetry::HotsetName;
use crate::{CacheOrchestrator, HotsetConfig, HotsetTelemetry};

pub(crate) const DEFAULT_NAME: HotsetName = "hotset";
const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_PROMOTION_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_SNAPSHOT_TTL: TtlJitter = TtlJitter::new(Duration::from_secs(600), Duration::from_secs(120));
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

/// Builder for [`CacheOrchestrator`].
///
/// The local tier, snapshot tier and store are set with [`local`](Self::local),
/// [`snapshot`](Self::snapshot) and [`store`](Self::store); `build` becomes available once
/// all three are present. Tiers are taken by value, so pass a clone of a tier that is also
/// handed to a [`SnapshotScheduler`](crate::SnapshotScheduler).
#[derive(Debug)]
pub struct OrchestratorBuilder<K, V, L = (), D = (), C = ()> {
    clock: Clock,
    local: L,
    snapshot: D,
    store: C,
    detector: Option<Arc<HeavyKeeper<K>>>,
    snapshot_timeout: Duration,
    promotion_timeout: Duration,
    snapshot_ttl: TtlJitter,
    workers: usize,
    queue_capacity: usize,
    telemetry: HotsetTelemetry,
    name: HotsetName,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> OrchestratorBuilder<K, V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            local: (),
            snapshot: (),
            store: (),
            detector: None,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            promotion_timeout: DEFAULT_PROMOTION_TIMEOUT,
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            telemetry: HotsetTelemetry::default(),
            name: DEFAULT_NAME,
            _value: PhantomData,
        }
    }
}

impl<K, V, L, D, C> OrchestratorBuilder<K, V, L, D, C> {
    /// Sets the local tier.
    pub fn local<L2>(self, local: L2) -> OrchestratorBuilder<K, V, L2, D, C> {
        OrchestratorBuilder {
            clock: self.clock,
            local,
            snapshot: self.snapshot,
            store: self.store,
            detector: self.detector,
            snapshot_timeout: self.snapshot_timeout,
            promotion_timeout: self.promotion_timeout,
            snapshot_ttl: self.snapshot_ttl,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Sets the snapshot tier.
    pub fn snapshot<D2>(self, snapshot: D2) -> OrchestratorBuilder<K, V, L, D2, C> {
        OrchestratorBuilder {
            clock: self.clock,
            local: self.local,
            snapshot,
            store: self.store,
            detector: self.detector,
            snapshot_timeout: self.snapshot_timeout,
            promotion_timeout: self.promotion_timeout,
            snapshot_ttl: self.snapshot_ttl,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Sets the canonical store.
    pub fn store<C2>(self, store: C2) -> OrchestratorBuilder<K, V, L, D, C2> {
        OrchestratorBuilder {
            clock: self.clock,
            local: self.local,
            snapshot: self.snapshot,
            store,
            detector: self.detector,
            snapshot_timeout: self.snapshot_timeout,
            promotion_timeout: self.promotion_timeout,
            snapshot_ttl: self.snapshot_ttl,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Uses an existing detector, typically one shared with a scheduler.
    ///
    /// Without it a detector with default dimensions is created.
    #[must_use]
    pub fn detector(mut self, detector: Arc<HeavyKeeper<K>>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Bounds every snapshot tier read. Defaults to 100 ms.
    #[must_use]
    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = timeout;
        self
    }

    /// Bounds the snapshot tier write of each promotion. Defaults to 1 s.
    ///
    /// A write that runs out of time is recorded as a failed promotion and the worker moves on.
    #[must_use]
    pub fn promotion_timeout(mut self, timeout: Duration) -> Self {
        self.promotion_timeout = timeout;
        self
    }

    /// TTL of values promoted from the store into the snapshot tier. Defaults to 600 s plus
    /// up to 120 s of jitter.
    #[must_use]
    pub fn snapshot_ttl(mut self, ttl: TtlJitter) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Number of promotion workers. Defaults to 4; zero is raised to one.
    #[must_use]
    pub fn promotion_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Pending promotions beyond which new ones are dropped. Defaults to 1024; zero is
    /// raised to one.
    #[must_use]
    pub fn promotion_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Applies the timeout, TTL and promotion settings of `config`.
    #[must_use]
    pub fn config(self, config: &HotsetConfig) -> Self {
        self.snapshot_timeout(config.snapshot_timeout())
            .promotion_timeout(config.promotion_timeout())
            .snapshot_ttl(config.snapshot_ttl())
            .promotion_workers(config.promotion_workers)
            .promotion_queue_capacity(config.promotion_queue_capacity)
    }

    /// Enables telemetry, reporting under `name`.
    #[must_use]
    pub fn telemetry(mut self, telemetry: HotsetTelemetry, name: HotsetName) -> Self {
        self.telemetry = telemetry;
        self.name = name;
        self
    }
}

impl<K, V, L, D, C> OrchestratorBuilder<K, V, L, D, C>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: LocalTier<K, V> + 'static,
    D: SnapshotTier<K, V> + 'static,
    C: CanonicalStore<K, V>,
{
    /// Builds the orchestrator and starts its promotion workers.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn build(self) -> CacheOrchestrator<K, V, L, D, C> {
        let tiers = Tiers {
            local: self.local,
            snapshot: self.snapshot,
            snapshot_ttl: self.snapshot_ttl,
            write_timeout: self.promotion_timeout,
            clock: self.clock,
            telemetry: self.telemetry,
            name: self.name,
        };

        CacheOrchestrator::new(
            self.detector.unwrap_or_default(),
            tiers,
            self.store,
            self.snapshot_timeout,
            self.workers,
            self.queue_capacity,
        )
    }
}
