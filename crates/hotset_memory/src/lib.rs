// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory tiers for the hot-key aware tiered cache.
//!
//! [`LocalCache`] is the in-process tier, backed by moka. [`InMemorySnapshotTier`] is a
//! snapshot tier that lives in the same process, useful for tests and single-node setups.
//!
//! # Quick Start
//!
//! ```
//! use hotset_memory::LocalCacheBuilder;
//! use hotset_tier::{CacheEntry, LocalTier};
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let cache = LocalCacheBuilder::<String, i32>::new()
//!     .max_capacity(1000)
//!     .time_to_live(Duration::from_secs(300))
//!     .build();
//!
//! cache.insert(&"key".to_string(), CacheEntry::new(42)).await;
//! let value = cache.get(&"key".to_string()).await;
//! assert_eq!(*value.unwrap().value(), 42);
//! # });
//! ```

mod builder;
mod local;
mod snapshot;

#[doc(inline)]
pub use builder::LocalCacheBuilder;
#[doc(inline)]
pub use local::LocalCache;
#[doc(inline)]
pub use snapshot::InMemorySnapshotTier;
