// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use hotset_sketch::{HeavyKeeper, TopKItem};
use hotset_tier::{CanonicalStore, SnapshotTier, TtlJitter};
use tick::{Clock, FutureExt, PeriodicTimer};
use tokio::task::JoinHandle;

use crate::builder::{DEFAULT_NAME, DEFAULT_SNAPSHOT_TTL};
use crate::telemetry::{HotsetActivity, HotsetName, HotsetOperation, HotsetTelemetry};
use crate::HotsetConfig;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// What a single [`SnapshotScheduler::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlushOutcome {
    /// Another flush was still in flight.
    Skipped,
    /// The hot set was empty, or none of its keys exist in the store.
    Empty,
    /// This many records were written to the snapshot tier in one batch.
    Written(usize),
    /// The store read or the snapshot write failed. The snapshot stays as it was.
    Failed,
}

/// Periodically copies the current hot set from the canonical store into the snapshot tier.
///
/// Each flush reads the detector's top-K keys, fetches their records with one
/// [`batch_get`](CanonicalStore::batch_get) and writes them with one
/// [`batch_insert`](SnapshotTier::batch_insert), giving every key its own jittered TTL.
/// Flushes never overlap: a flush started while another is running returns
/// [`FlushOutcome::Skipped`]. Failures are recorded and retried at the next interval.
///
/// Clones share the same in-flight state.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use hotset::SnapshotScheduler;
/// use hotset_memory::InMemorySnapshotTier;
/// use hotset_sketch::HeavyKeeper;
/// use hotset_tier::testing::MockStore;
/// use tick::Clock;
///
/// # async fn example() {
/// let clock = Clock::new_tokio();
/// let detector = Arc::new(HeavyKeeper::<String>::default());
///
/// let scheduler = SnapshotScheduler::builder::<String, u64>(clock.clone())
///     .detector(detector)
///     .snapshot(InMemorySnapshotTier::new(clock))
///     .store(MockStore::new())
///     .interval(Duration::from_secs(60))
///     .build();
///
/// let handle = scheduler.spawn();
/// // ...
/// handle.stop();
/// # }
/// ```
pub struct SnapshotScheduler<K, V, D, C> {
    inner: Arc<SchedulerInner<K, V, D, C>>,
}

struct SchedulerInner<K, V, D, C> {
    detector: Arc<HeavyKeeper<K>>,
    snapshot: D,
    store: C,
    clock: Clock,
    interval: Duration,
    ttl: TtlJitter,
    flush_timeout: Duration,
    telemetry: HotsetTelemetry,
    name: HotsetName,
    in_flight: AtomicBool,
    _value: PhantomData<fn() -> V>,
}

impl SnapshotScheduler<(), (), (), ()> {
    /// Creates a builder. The detector, snapshot tier and store are required.
    #[must_use]
    pub fn builder<K, V>(clock: Clock) -> SchedulerBuilder<K, V> {
        SchedulerBuilder::new(clock)
    }
}

impl<K, V, D, C> SnapshotScheduler<K, V, D, C>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    D: SnapshotTier<K, V> + 'static,
    C: CanonicalStore<K, V> + 'static,
{
    /// Runs one flush now.
    ///
    /// Never fails; the outcome is returned for inspection and recorded through telemetry.
    pub async fn flush(&self) -> FlushOutcome {
        let inner = &*self.inner;
        let Some(_guard) = FlushGuard::acquire(&inner.in_flight) else {
            self.record(HotsetActivity::FlushSkipped, None);
            return FlushOutcome::Skipped;
        };

        let hot = inner.detector.top_k();
        inner
            .telemetry
            .record_tracked(inner.name, u64::try_from(hot.len()).unwrap_or(u64::MAX));
        if hot.is_empty() {
            self.record(HotsetActivity::FlushEmpty, None);
            return FlushOutcome::Empty;
        }

        let keys: Vec<K> = hot.into_iter().map(TopKItem::into_key).collect();
        let stopwatch = inner.clock.stopwatch();

        let records = match inner.store.batch_get(&keys).await {
            Ok(records) => records,
            Err(error) => {
                self.record_failure(Some(stopwatch.elapsed()), &error);
                return FlushOutcome::Failed;
            }
        };

        // Keys deleted from the store are absent here and left to expire from the snapshot.
        if records.is_empty() {
            self.record(HotsetActivity::FlushEmpty, Some(stopwatch.elapsed()));
            return FlushOutcome::Empty;
        }

        let written = records.len();
        let result = inner
            .snapshot
            .batch_insert(records, inner.ttl)
            .timeout(&inner.clock, inner.flush_timeout)
            .await;
        let elapsed = stopwatch.elapsed();

        match result {
            Ok(Ok(())) => {
                self.record(HotsetActivity::FlushWritten, Some(elapsed));
                FlushOutcome::Written(written)
            }
            Ok(Err(error)) => {
                self.record_failure(Some(elapsed), &error);
                FlushOutcome::Failed
            }
            Err(error) => {
                self.record_failure(Some(elapsed), &error);
                FlushOutcome::Failed
            }
        }
    }

    /// Flushes once per interval until the returned future is dropped.
    ///
    /// Each tick runs its flush on a separate task, so a flush that outlasts the interval
    /// makes the following ticks skip instead of queueing behind it.
    ///
    /// # Panics
    ///
    /// Panics if polled outside of a tokio runtime.
    pub async fn run(&self) {
        let mut timer = PeriodicTimer::new(&self.inner.clock, self.inner.interval);

        while timer.next().await.is_some() {
            let scheduler = self.clone();
            drop(tokio::spawn(async move {
                scheduler.flush().await;
            }));
        }
    }

    /// Starts [`run`](Self::run) on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(&self) -> SchedulerHandle {
        let scheduler = self.clone();
        SchedulerHandle {
            task: tokio::spawn(async move { scheduler.run().await }),
        }
    }

    /// Whether a flush is currently running.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// The detector whose hot set is flushed.
    #[must_use]
    pub fn detector(&self) -> &Arc<HeavyKeeper<K>> {
        &self.inner.detector
    }

    fn record(&self, activity: HotsetActivity, duration: Option<Duration>) {
        self.inner
            .telemetry
            .record(self.inner.name, HotsetOperation::Flush, activity, duration);
    }

    fn record_failure(&self, duration: Option<Duration>, reason: &dyn std::fmt::Display) {
        self.inner.telemetry.record_failure(
            self.inner.name,
            HotsetOperation::Flush,
            HotsetActivity::FlushFailed,
            duration,
            reason,
        );
    }
}

impl<K, V, D, C> Clone for SnapshotScheduler<K, V, D, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, D, C> Debug for SnapshotScheduler<K, V, D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotScheduler")
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .field("ttl", &self.inner.ttl)
            .field("in_flight", &self.inner.in_flight)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when the flush ends, including on cancellation.
struct FlushGuard<'a>(&'a AtomicBool);

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a scheduler started with [`SnapshotScheduler::spawn`].
///
/// Dropping the handle leaves the scheduler running.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops ticking. A flush already running finishes on its own.
    pub fn stop(self) {
        self.task.abort();
    }

    /// Whether the ticking task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Builder for [`SnapshotScheduler`].
///
/// `build` becomes available once the detector, snapshot tier and store are set:
///
/// ```compile_fail
/// use hotset::SnapshotScheduler;
/// use hotset_memory::InMemorySnapshotTier;
/// use hotset_tier::testing::MockStore;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let scheduler = SnapshotScheduler::builder::<String, u64>(clock.clone())
///     .snapshot(InMemorySnapshotTier::new(clock))
///     .store(MockStore::new())
///     .build();
/// ```
#[derive(Debug)]
pub struct SchedulerBuilder<K, V, D = (), C = (), H = ()> {
    clock: Clock,
    detector: H,
    snapshot: D,
    store: C,
    interval: Duration,
    ttl: TtlJitter,
    flush_timeout: Duration,
    telemetry: HotsetTelemetry,
    name: HotsetName,
    _value: PhantomData<fn() -> (K, V)>,
}

impl<K, V> SchedulerBuilder<K, V> {
    fn new(clock: Clock) -> Self {
        Self {
            clock,
            detector: (),
            snapshot: (),
            store: (),
            interval: DEFAULT_INTERVAL,
            ttl: DEFAULT_SNAPSHOT_TTL,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            telemetry: HotsetTelemetry::default(),
            name: DEFAULT_NAME,
            _value: PhantomData,
        }
    }
}

impl<K, V, D, C, H> SchedulerBuilder<K, V, D, C, H> {
    /// Sets the snapshot tier written by every flush.
    pub fn snapshot<D2>(self, snapshot: D2) -> SchedulerBuilder<K, V, D2, C, H> {
        SchedulerBuilder {
            clock: self.clock,
            detector: self.detector,
            snapshot,
            store: self.store,
            interval: self.interval,
            ttl: self.ttl,
            flush_timeout: self.flush_timeout,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Sets the canonical store read by every flush.
    pub fn store<C2>(self, store: C2) -> SchedulerBuilder<K, V, D, C2, H> {
        SchedulerBuilder {
            clock: self.clock,
            detector: self.detector,
            snapshot: self.snapshot,
            store,
            interval: self.interval,
            ttl: self.ttl,
            flush_timeout: self.flush_timeout,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Sets the detector to read the hot set from, usually
    /// [`CacheOrchestrator::detector`](crate::CacheOrchestrator::detector).
    pub fn detector(self, detector: Arc<HeavyKeeper<K>>) -> SchedulerBuilder<K, V, D, C, Arc<HeavyKeeper<K>>> {
        SchedulerBuilder {
            clock: self.clock,
            detector,
            snapshot: self.snapshot,
            store: self.store,
            interval: self.interval,
            ttl: self.ttl,
            flush_timeout: self.flush_timeout,
            telemetry: self.telemetry,
            name: self.name,
            _value: PhantomData,
        }
    }

    /// Time between flushes. Defaults to 60 s.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// TTL given to each written key. Defaults to 600 s plus up to 120 s of jitter.
    #[must_use]
    pub fn ttl(mut self, ttl: TtlJitter) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bounds the snapshot batch write. Defaults to 30 s.
    #[must_use]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Applies the interval and TTL settings of `config`.
    #[must_use]
    pub fn config(self, config: &HotsetConfig) -> Self {
        self.interval(config.flush_interval()).ttl(config.snapshot_ttl())
    }

    /// Enables telemetry, reporting under `name`.
    #[must_use]
    pub fn telemetry(mut self, telemetry: HotsetTelemetry, name: HotsetName) -> Self {
        self.telemetry = telemetry;
        self.name = name;
        self
    }
}

impl<K, V, D, C> SchedulerBuilder<K, V, D, C, Arc<HeavyKeeper<K>>>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    D: SnapshotTier<K, V> + 'static,
    C: CanonicalStore<K, V> + 'static,
{
    /// Builds the scheduler. Nothing runs until [`flush`](SnapshotScheduler::flush),
    /// [`run`](SnapshotScheduler::run) or [`spawn`](SnapshotScheduler::spawn) is called.
    #[must_use]
    pub fn build(self) -> SnapshotScheduler<K, V, D, C> {
        SnapshotScheduler {
            inner: Arc::new(SchedulerInner {
                detector: self.detector,
                snapshot: self.snapshot,
                store: self.store,
                clock: self.clock,
                interval: self.interval,
                ttl: self.ttl,
                flush_timeout: self.flush_timeout,
                telemetry: self.telemetry,
                name: self.name,
                in_flight: AtomicBool::new(false),
                _value: PhantomData,
            }),
        }
    }
}
