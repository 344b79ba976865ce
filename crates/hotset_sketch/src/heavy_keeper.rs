// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use foldhash::fast::RandomState;

use crate::{ConfigError, FrequencySketch, TopKItem, TopKTracker};

pub(crate) const DEFAULT_WIDTH: usize = 10_000;
pub(crate) const DEFAULT_DEPTH: usize = 10;
pub(crate) const DEFAULT_K: usize = 100;
pub(crate) const DEFAULT_DECAY: f64 = 1.08;

/// Hot-key detector combining a [`FrequencySketch`] with a [`TopKTracker`].
///
/// Every call to [`add`](Self::add) records the key in the sketch and offers the resulting
/// estimate to the tracker. Keys that end up tracked are considered hot.
///
/// # Examples
///
/// ```
/// use hotset_sketch::HeavyKeeper;
///
/// let detector = HeavyKeeper::<u64>::builder().k(2).build()?;
/// detector.add(&1);
/// detector.add(&1);
/// detector.add(&2);
///
/// let hot: Vec<u64> = detector.top_k().into_iter().map(|item| item.into_key()).collect();
/// assert_eq!(hot, vec![1, 2]);
/// # Ok::<(), hotset_sketch::ConfigError>(())
/// ```
pub struct HeavyKeeper<K, S = RandomState> {
    sketch: FrequencySketch<S>,
    top_k: TopKTracker<K>,
}

impl<K> HeavyKeeper<K>
where
    K: Clone + Eq + Hash + Ord,
{
    /// Creates a builder populated with the default dimensions.
    #[must_use]
    pub fn builder() -> HeavyKeeperBuilder<K> {
        HeavyKeeperBuilder::new()
    }
}

impl<K> Default for HeavyKeeper<K>
where
    K: Clone + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::from_parts(
            FrequencySketch::with_hasher_unchecked(DEFAULT_WIDTH, DEFAULT_DEPTH, DEFAULT_DECAY, RandomState::default()),
            TopKTracker::new_unchecked(DEFAULT_K),
        )
    }
}

impl<K, S> HeavyKeeper<K, S>
where
    K: Clone + Eq + Hash + Ord,
    S: BuildHasher,
{
    /// Assembles a detector from an existing sketch and tracker.
    pub fn from_parts(sketch: FrequencySketch<S>, top_k: TopKTracker<K>) -> Self {
        Self { sketch, top_k }
    }

    /// Records one access to `key` and returns whether it is hot afterwards.
    pub fn add(&self, key: &K) -> bool {
        let estimate = self.sketch.record(key);
        self.top_k.offer(key, estimate)
    }

    /// Current frequency estimate of `key`.
    pub fn query(&self, key: &K) -> u32 {
        self.sketch.query(key)
    }

    /// Hot keys ordered by estimate, largest first.
    pub fn top_k(&self) -> Vec<TopKItem<K>> {
        self.top_k.snapshot()
    }

    /// Whether `key` is currently among the hot keys.
    pub fn is_hot(&self, key: &K) -> bool {
        self.top_k.contains(key)
    }

    /// Number of hot keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.top_k.len()
    }

    /// Forgets all recorded accesses and hot keys.
    pub fn clear(&self) {
        self.sketch.clear();
        self.top_k.clear();
    }

    /// The underlying sketch.
    pub fn sketch(&self) -> &FrequencySketch<S> {
        &self.sketch
    }

    /// The underlying tracker.
    pub fn tracker(&self) -> &TopKTracker<K> {
        &self.top_k
    }
}

impl<K, S> Debug for HeavyKeeper<K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeavyKeeper")
            .field("sketch", &self.sketch)
            .field("top_k", &self.top_k)
            .finish()
    }
}

/// Builder for [`HeavyKeeper`].
///
/// Defaults to a width of 10 000, a depth of 10, `k` of 100 and a decay base of 1.08.
#[derive(Debug)]
pub struct HeavyKeeperBuilder<K> {
    width: usize,
    depth: usize,
    k: usize,
    decay: f64,
    _key: PhantomData<fn() -> K>,
}

impl<K> HeavyKeeperBuilder<K>
where
    K: Clone + Eq + Hash + Ord,
{
    fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            depth: DEFAULT_DEPTH,
            k: DEFAULT_K,
            decay: DEFAULT_DECAY,
            _key: PhantomData,
        }
    }

    /// Number of buckets per row.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Number of rows.
    #[must_use]
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Maximum number of hot keys.
    #[must_use]
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Base of the exponential decay.
    #[must_use]
    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    /// Builds the detector.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any dimension is zero or the decay base is not a finite
    /// number greater than one.
    pub fn build(self) -> Result<HeavyKeeper<K>, ConfigError> {
        let sketch = FrequencySketch::try_new(self.width, self.depth, self.decay)?;
        let top_k = TopKTracker::try_new(self.k)?;
        Ok(HeavyKeeper::from_parts(sketch, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rnd::Rnd;

    static_assertions::assert_impl_all!(HeavyKeeper<String>: Send, Sync);

    fn without_decay(width: usize, depth: usize, k: usize) -> HeavyKeeper<&'static str> {
        let sketch = FrequencySketch::try_new(width, depth, DEFAULT_DECAY)
            .unwrap()
            .with_rnd(Rnd::new_fixed(1.0));
        HeavyKeeper::from_parts(sketch, TopKTracker::try_new(k).unwrap())
    }

    #[test]
    fn default_dimensions() {
        let detector = HeavyKeeper::<u32>::default();
        assert_eq!(detector.sketch().width(), DEFAULT_WIDTH);
        assert_eq!(detector.sketch().depth(), DEFAULT_DEPTH);
        assert_eq!(detector.tracker().k(), DEFAULT_K);
    }

    #[test]
    fn builder_validates() {
        assert_eq!(HeavyKeeper::<u32>::builder().k(0).build().unwrap_err().parameter(), "k");
        assert_eq!(HeavyKeeper::<u32>::builder().width(0).build().unwrap_err().parameter(), "width");
        assert_eq!(HeavyKeeper::<u32>::builder().decay(0.9).build().unwrap_err().parameter(), "decay");
    }

    #[test]
    fn skewed_stream_ranks_heavy_keys_first() {
        let detector = without_decay(1_000, 3, 10);
        for _ in 0..10 {
            detector.add(&"apple");
        }
        for _ in 0..5 {
            detector.add(&"banana");
        }
        for key in ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8"] {
            detector.add(&key);
        }

        assert_eq!(detector.query(&"apple"), 10);
        assert!(detector.is_hot(&"apple"));
        assert!(detector.is_hot(&"banana"));

        let top = detector.top_k();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].key(), &"apple");
        assert_eq!(top[0].count(), 10);
        assert_eq!(top[1].key(), &"banana");
    }

    #[test]
    fn add_reports_membership() {
        let detector = without_decay(100, 2, 1);
        assert!(detector.add(&"first"));
        assert!(detector.add(&"first"));

        // One occurrence never beats a stored count of two.
        assert!(!detector.add(&"second"));
        assert!(!detector.is_hot(&"second"));
    }

    #[test]
    fn clear_resets_detector() {
        let detector = without_decay(100, 2, 4);
        detector.add(&"a");
        detector.clear();
        assert_eq!(detector.query(&"a"), 0);
        assert_eq!(detector.tracked(), 0);
        assert!(detector.top_k().is_empty());
    }
}
