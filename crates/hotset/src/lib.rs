// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Hot-key aware tiered caching.
//!
//! Reads go through a [`CacheOrchestrator`], which records every key in a HeavyKeeper
//! detector and resolves values through three tiers:
//! - a bounded local cache in process memory
//! - a shared snapshot tier holding the current hot set
//! - the canonical store, which is authoritative
//!
//! Values of hot keys found in a slower tier are promoted to the faster ones in the
//! background. A [`SnapshotScheduler`] periodically rewrites the snapshot tier with the
//! records of the current top-K keys, each with a jittered TTL.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use hotset::{CacheOrchestrator, FlushOutcome, SnapshotScheduler};
//! use hotset_memory::{InMemorySnapshotTier, LocalCache};
//! use hotset_tier::testing::MockStore;
//! use tick::Clock;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), hotset_tier::StoreError> {
//! let clock = Clock::new_tokio();
//! let store = MockStore::with_data(HashMap::from([("post:1".to_string(), 42_u64)]));
//! let snapshot = InMemorySnapshotTier::new(clock.clone());
//!
//! let orchestrator = CacheOrchestrator::builder::<String, u64>(clock.clone())
//!     .local(LocalCache::with_capacity(1_000))
//!     .snapshot(snapshot.clone())
//!     .store(store.clone())
//!     .build();
//!
//! let scheduler = SnapshotScheduler::builder::<String, u64>(clock)
//!     .detector(orchestrator.detector().clone())
//!     .snapshot(snapshot.clone())
//!     .store(store)
//!     .interval(Duration::from_secs(60))
//!     .build();
//!
//! assert_eq!(orchestrator.get(&"post:1".to_string()).await?, Some(42));
//! assert_eq!(scheduler.flush().await, FlushOutcome::Written(1));
//! assert_eq!(snapshot.len(), 1);
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod orchestrator;
mod promotion;
mod scheduler;
mod telemetry;

#[doc(inline)]
pub use builder::OrchestratorBuilder;
#[doc(inline)]
pub use config::HotsetConfig;
#[doc(inline)]
pub use hotset_sketch::{ConfigError, HeavyKeeper, HeavyKeeperBuilder, TopKItem};
#[doc(inline)]
pub use hotset_tier::{CacheEntry, CanonicalStore, LocalTier, SnapshotTier, StoreError, StoreErrorKind, TtlJitter};
#[doc(inline)]
pub use orchestrator::CacheOrchestrator;
#[doc(inline)]
pub use scheduler::{FlushOutcome, SchedulerBuilder, SchedulerHandle, SnapshotScheduler};
#[doc(inline)]
pub use telemetry::{HotsetName, HotsetTelemetry};
