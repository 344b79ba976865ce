// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! File-friendly configuration of a hot-key aware cache.

use std::hash::Hash;
use std::time::Duration;

use hotset_memory::LocalCache;
use hotset_sketch::{ConfigError, HeavyKeeper};
use hotset_tier::TtlJitter;
use serde::{Deserialize, Serialize};

/// Every tunable of the detector, the tiers, the promotion pool and the scheduler.
///
/// All fields have defaults, so an empty document deserializes to a working setup.
///
/// # Examples
///
/// ```
/// use hotset::HotsetConfig;
///
/// let config: HotsetConfig = serde_json::from_str(r#"{ "k": 20, "flush_interval_secs": 30 }"#)?;
/// assert_eq!(config.k, 20);
/// assert_eq!(config.width, 10_000);
/// config.validate()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HotsetConfig {
    /// Buckets per sketch row.
    pub width: usize,

    /// Sketch rows.
    pub depth: usize,

    /// Size of the hot set.
    pub k: usize,

    /// Decay base; must be greater than one.
    pub decay: f64,

    /// Maximum entries in the local tier.
    pub local_capacity: u64,

    /// Local tier entry lifetime in seconds.
    pub local_ttl_secs: u64,

    /// Seconds between snapshot flushes.
    pub flush_interval_secs: u64,

    /// Base lifetime of snapshot entries in seconds.
    pub snapshot_ttl_secs: u64,

    /// Upper bound of the random extra lifetime of snapshot entries in seconds.
    pub snapshot_ttl_jitter_secs: u64,

    /// Snapshot tier read timeout in milliseconds.
    pub snapshot_timeout_ms: u64,

    /// Snapshot tier write timeout of a single promotion in milliseconds.
    pub promotion_timeout_ms: u64,

    /// Number of promotion workers.
    pub promotion_workers: usize,

    /// Pending promotions beyond which new ones are dropped.
    pub promotion_queue_capacity: usize,
}

impl Default for HotsetConfig {
    fn default() -> Self {
        Self {
            width: 10_000,
            depth: 10,
            k: 100,
            decay: 1.08,
            local_capacity: 1_000,
            local_ttl_secs: 300,
            flush_interval_secs: 60,
            snapshot_ttl_secs: 600,
            snapshot_ttl_jitter_secs: 120,
            snapshot_timeout_ms: 100,
            promotion_timeout_ms: 1_000,
            promotion_workers: 4,
            promotion_queue_capacity: 1_024,
        }
    }
}

impl HotsetConfig {
    /// Checks every parameter that would otherwise fail later.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.decay.is_finite() || self.decay <= 1.0 {
            return Err(ConfigError::for_parameter("decay"));
        }

        let positive = [
            ("width", self.width),
            ("depth", self.depth),
            ("k", self.k),
            ("promotion_workers", self.promotion_workers),
            ("promotion_queue_capacity", self.promotion_queue_capacity),
        ];
        if let Some((parameter, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::for_parameter(parameter));
        }

        let nonzero = [
            ("flush_interval_secs", self.flush_interval_secs),
            ("snapshot_timeout_ms", self.snapshot_timeout_ms),
            ("promotion_timeout_ms", self.promotion_timeout_ms),
        ];
        if let Some((parameter, _)) = nonzero.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::for_parameter(parameter));
        }

        Ok(())
    }

    /// Builds the hot-key detector.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the sketch dimensions are invalid.
    pub fn heavy_keeper<K>(&self) -> Result<HeavyKeeper<K>, ConfigError>
    where
        K: Clone + Eq + Hash + Ord,
    {
        HeavyKeeper::builder()
            .width(self.width)
            .depth(self.depth)
            .k(self.k)
            .decay(self.decay)
            .build()
    }

    /// Builds the local tier.
    #[must_use]
    pub fn local_cache<K, V>(&self) -> LocalCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        LocalCache::builder()
            .max_capacity(self.local_capacity)
            .time_to_live(Duration::from_secs(self.local_ttl_secs))
            .build()
    }

    /// TTL policy for snapshot writes.
    #[must_use]
    pub fn snapshot_ttl(&self) -> TtlJitter {
        TtlJitter::new(
            Duration::from_secs(self.snapshot_ttl_secs),
            Duration::from_secs(self.snapshot_ttl_jitter_secs),
        )
    }

    /// Snapshot read timeout.
    #[must_use]
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }

    /// Snapshot write timeout of a single promotion.
    #[must_use]
    pub fn promotion_timeout(&self) -> Duration {
        Duration::from_millis(self.promotion_timeout_ms)
    }

    /// Time between flushes.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: HotsetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HotsetConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_document_overrides() {
        let config: HotsetConfig = serde_json::from_str(r#"{ "depth": 4, "snapshot_timeout_ms": 25 }"#).unwrap();
        assert_eq!(config.depth, 4);
        assert_eq!(config.snapshot_timeout(), Duration::from_millis(25));
        assert_eq!(config.width, 10_000);
    }

    #[test]
    fn round_trips_through_json() {
        let config = HotsetConfig {
            k: 7,
            ..HotsetConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: HotsetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn validate_names_offending_parameter() {
        let cases = [
            (HotsetConfig { width: 0, ..HotsetConfig::default() }, "width"),
            (HotsetConfig { k: 0, ..HotsetConfig::default() }, "k"),
            (HotsetConfig { decay: 1.0, ..HotsetConfig::default() }, "decay"),
            (
                HotsetConfig {
                    promotion_workers: 0,
                    ..HotsetConfig::default()
                },
                "promotion_workers",
            ),
            (
                HotsetConfig {
                    flush_interval_secs: 0,
                    ..HotsetConfig::default()
                },
                "flush_interval_secs",
            ),
            (
                HotsetConfig {
                    snapshot_timeout_ms: 0,
                    ..HotsetConfig::default()
                },
                "snapshot_timeout_ms",
            ),
            (
                HotsetConfig {
                    promotion_timeout_ms: 0,
                    ..HotsetConfig::default()
                },
                "promotion_timeout_ms",
            ),
        ];

        for (config, parameter) in cases {
            assert_eq!(config.validate().unwrap_err().parameter(), parameter);
        }
    }

    #[test]
    fn derived_values() {
        let config = HotsetConfig::default();
        assert_eq!(config.snapshot_ttl(), TtlJitter::new(Duration::from_secs(600), Duration::from_secs(120)));
        assert_eq!(config.flush_interval(), Duration::from_secs(60));
        assert_eq!(config.promotion_timeout(), Duration::from_secs(1));

        let detector = config.heavy_keeper::<String>().unwrap();
        assert_eq!(detector.tracker().k(), 100);
        assert_eq!(detector.sketch().width(), 10_000);
    }
}
