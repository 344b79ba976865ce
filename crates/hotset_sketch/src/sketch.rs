// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The HeavyKeeper counting matrix.
//!
//! Every row maps a key to one bucket. A bucket remembers the fingerprint of the key that
//! currently owns it together with that key's count. Keys that land on an occupied bucket
//! owned by someone else decay the incumbent with probability `decay^(-count)`, so large
//! counts are almost never disturbed while small ones churn quickly.

use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

use foldhash::fast::RandomState;
use parking_lot::RwLock;

use crate::ConfigError;
use crate::rnd::Rnd;

/// Salt mixed into the key hash once per row so that rows index independently.
const ROW_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Bucket {
    fingerprint: u32,
    count: u32,
}

impl Bucket {
    fn owned_by(self, fingerprint: u32) -> bool {
        self.count > 0 && self.fingerprint == fingerprint
    }

    fn claim(&mut self, fingerprint: u32) {
        self.fingerprint = fingerprint;
        self.count = 1;
    }
}

/// One row of the matrix.
///
/// Aligned to the cache line so that the locks of neighbouring rows never share one.
#[repr(align(64))]
struct Row {
    buckets: RwLock<Box<[Bucket]>>,
}

impl Row {
    fn new(width: usize) -> Self {
        Self {
            buckets: RwLock::new(vec![Bucket::default(); width].into_boxed_slice()),
        }
    }
}

/// Hash-derived coordinates of a key inside the matrix.
#[derive(Clone, Copy, Debug)]
struct Probe {
    hash: u64,
    fingerprint: u32,
}

impl Probe {
    #[expect(clippy::cast_possible_truncation, reason = "the upper half of the hash is the fingerprint")]
    fn new(hash: u64) -> Self {
        Self {
            hash,
            fingerprint: (hash >> 32) as u32,
        }
    }

    #[expect(clippy::cast_possible_truncation, reason = "the remainder is always below width")]
    fn position(self, row: usize, width: usize) -> usize {
        let salted = self.hash ^ ROW_SALT.wrapping_mul(row as u64 + 1);
        (mix64(salted) % width as u64) as usize
    }
}

/// `SplitMix64` finalizer.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A HeavyKeeper frequency sketch.
///
/// Estimates returned by [`query`](Self::query) never overstate how often a key was
/// recorded, barring a fingerprint collision. The hasher is fixed for the lifetime of the
/// sketch, so a key always maps to the same buckets and fingerprint.
///
/// # Examples
///
/// ```
/// use hotset_sketch::FrequencySketch;
///
/// let sketch = FrequencySketch::try_new(1_000, 3, 1.08)?;
/// sketch.record("a");
/// sketch.record("a");
/// assert_eq!(sketch.query("a"), 2);
/// assert_eq!(sketch.query("never-seen"), 0);
/// # Ok::<(), hotset_sketch::ConfigError>(())
/// ```
pub struct FrequencySketch<S = RandomState> {
    rows: Box<[Row]>,
    width: usize,
    decay: f64,
    hasher: S,
    rnd: Rnd,
}

impl FrequencySketch {
    /// Creates a sketch with `depth` rows of `width` buckets each.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `width` or `depth` is zero, or if `decay` is not a finite
    /// number greater than one.
    pub fn try_new(width: usize, depth: usize, decay: f64) -> Result<Self, ConfigError> {
        Self::with_hasher(width, depth, decay, RandomState::default())
    }
}

impl<S: BuildHasher> FrequencySketch<S> {
    /// Creates a sketch that hashes keys with `hasher`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FrequencySketch::try_new`].
    pub fn with_hasher(width: usize, depth: usize, decay: f64, hasher: S) -> Result<Self, ConfigError> {
        validate(width, depth, decay)?;
        Ok(Self::with_hasher_unchecked(width, depth, decay, hasher))
    }

    pub(crate) fn with_hasher_unchecked(width: usize, depth: usize, decay: f64, hasher: S) -> Self {
        Self {
            rows: (0..depth).map(|_| Row::new(width)).collect(),
            width,
            decay,
            hasher,
            rnd: Rnd::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_rnd(mut self, rnd: Rnd) -> Self {
        self.rnd = rnd;
        self
    }

    /// Records one occurrence of `key` and returns the resulting estimate.
    ///
    /// The estimate is the smallest bucket count observed across the rows after the update.
    /// A row whose bucket is owned by a different key contributes the owner's count.
    pub fn record<K: Hash + ?Sized>(&self, key: &K) -> u32 {
        let probe = self.probe(key);

        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let mut buckets = row.buckets.write();
                self.update(&mut buckets[probe.position(index, self.width)], probe.fingerprint)
            })
            .min()
            .unwrap_or(0)
    }

    /// Returns the current estimate for `key` without modifying the sketch.
    ///
    /// Rows whose bucket is owned by another key are ignored. Returns zero when no row
    /// remembers the key.
    pub fn query<K: Hash + ?Sized>(&self, key: &K) -> u32 {
        let probe = self.probe(key);

        self.rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let bucket = row.buckets.read()[probe.position(index, self.width)];
                bucket.owned_by(probe.fingerprint).then_some(bucket.count)
            })
            .min()
            .unwrap_or(0)
    }

    /// Resets every bucket to empty.
    pub fn clear(&self) {
        for row in &*self.rows {
            row.buckets.write().fill(Bucket::default());
        }
    }

    /// Number of buckets per row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    /// Base of the exponential decay.
    #[must_use]
    pub fn decay(&self) -> f64 {
        self.decay
    }

    fn probe<K: Hash + ?Sized>(&self, key: &K) -> Probe {
        Probe::new(self.hasher.hash_one(key))
    }

    fn update(&self, bucket: &mut Bucket, fingerprint: u32) -> u32 {
        if bucket.count == 0 {
            bucket.claim(fingerprint);
        } else if bucket.fingerprint == fingerprint {
            bucket.count = bucket.count.saturating_add(1);
        } else if self.should_decay(bucket.count) {
            bucket.count -= 1;
            if bucket.count == 0 {
                bucket.claim(fingerprint);
            }
        }

        bucket.count
    }

    fn should_decay(&self, count: u32) -> bool {
        self.rnd.next_f64() < self.decay.powf(-f64::from(count))
    }
}

impl<S> Debug for FrequencySketch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencySketch")
            .field("width", &self.width)
            .field("depth", &self.rows.len())
            .field("decay", &self.decay)
            .finish_non_exhaustive()
    }
}

fn validate(width: usize, depth: usize, decay: f64) -> Result<(), ConfigError> {
    if width == 0 {
        return Err(ConfigError::for_parameter("width"));
    }

    if depth == 0 {
        return Err(ConfigError::for_parameter("depth"));
    }

    if !decay.is_finite() || decay <= 1.0 {
        return Err(ConfigError::for_parameter("decay"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(FrequencySketch: Send, Sync);

    fn sketch(width: usize, depth: usize) -> FrequencySketch {
        FrequencySketch::try_new(width, depth, 1.08).unwrap()
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(FrequencySketch::try_new(0, 3, 1.08).unwrap_err().parameter(), "width");
        assert_eq!(FrequencySketch::try_new(10, 0, 1.08).unwrap_err().parameter(), "depth");
        assert_eq!(FrequencySketch::try_new(10, 3, 1.0).unwrap_err().parameter(), "decay");
        assert_eq!(FrequencySketch::try_new(10, 3, 0.5).unwrap_err().parameter(), "decay");
        assert_eq!(FrequencySketch::try_new(10, 3, f64::NAN).unwrap_err().parameter(), "decay");
        assert_eq!(FrequencySketch::try_new(10, 3, f64::INFINITY).unwrap_err().parameter(), "decay");
    }

    #[test]
    fn accessors_report_dimensions() {
        let sketch = sketch(128, 4);
        assert_eq!(sketch.width(), 128);
        assert_eq!(sketch.depth(), 4);
        assert!((sketch.decay() - 1.08).abs() < f64::EPSILON);
    }

    #[test]
    fn unseen_key_queries_zero() {
        let sketch = sketch(1_000, 3);
        sketch.record("a");
        sketch.record("b");
        assert_eq!(sketch.query("c"), 0);
    }

    #[test]
    fn repeated_key_estimates_strictly_increase() {
        let sketch = sketch(64, 4);
        let estimates: Vec<u32> = (0..20).map(|_| sketch.record(&42_u64)).collect();
        assert_eq!(estimates, (1..=20).collect::<Vec<_>>());
        assert_eq!(sketch.query(&42_u64), 20);
    }

    #[test]
    fn challenger_takes_over_when_decay_fires() {
        let sketch = sketch(1, 1).with_rnd(Rnd::new_fixed(0.0));
        sketch.record("incumbent");

        assert_eq!(sketch.record("challenger"), 1);
        assert_eq!(sketch.query("incumbent"), 0);
        assert_eq!(sketch.query("challenger"), 1);
    }

    #[test]
    fn incumbent_survives_when_decay_does_not_fire() {
        let sketch = sketch(1, 1).with_rnd(Rnd::new_fixed(0.999_999));
        sketch.record("incumbent");
        sketch.record("incumbent");

        // The challenger observes the incumbent's count.
        assert_eq!(sketch.record("challenger"), 2);
        assert_eq!(sketch.query("incumbent"), 2);
        assert_eq!(sketch.query("challenger"), 0);
    }

    #[test]
    fn decay_partially_reduces_incumbent() {
        let sketch = sketch(1, 1).with_rnd(Rnd::new_fixed(0.0));
        for _ in 0..3 {
            sketch.record("incumbent");
        }

        assert_eq!(sketch.record("challenger"), 2);
        assert_eq!(sketch.query("incumbent"), 2);
        assert_eq!(sketch.query("challenger"), 0);
    }

    #[test]
    fn large_counts_resist_decay() {
        // 1.08^-100 is roughly 4.5e-4, far below the sampled value.
        let sketch = sketch(1, 1).with_rnd(Rnd::new_fixed(0.01));
        for _ in 0..100 {
            sketch.record("heavy");
        }

        for _ in 0..50 {
            sketch.record("light");
        }

        assert_eq!(sketch.query("heavy"), 100);
        assert_eq!(sketch.query("light"), 0);
    }

    #[test]
    fn clear_forgets_everything() {
        let sketch = sketch(32, 2);
        sketch.record("a");
        sketch.record("a");
        sketch.clear();
        assert_eq!(sketch.query("a"), 0);
        assert_eq!(sketch.record("a"), 1);
    }

    #[test]
    fn rows_index_independently() {
        let probe = Probe::new(0xDEAD_BEEF_0123_4567);
        let positions: Vec<usize> = (0..8).map(|row| probe.position(row, 1 << 20)).collect();
        let mut unique = positions.clone();
        unique.sort_unstable();
        unique.dedup();
        assert!(unique.len() > 1, "all rows mapped to {positions:?}");
        assert_eq!(probe.fingerprint, 0xDEAD_BEEF);
    }

    #[test]
    fn row_is_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<Row>(), 64);
    }

    #[test]
    fn debug_output() {
        let debug = format!("{:?}", sketch(8, 2));
        assert!(debug.contains("FrequencySketch"));
        assert!(debug.contains("width: 8"));
    }
}
