// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage tier abstractions for a hot-key aware tiered cache.
//!
//! Reads go through three tiers, fastest first:
//!
//! 1. [`LocalTier`]: an in-process cache. Infallible.
//! 2. [`SnapshotTier`]: a shared cache of hot values. Failures are treated as misses by
//!    callers.
//! 3. [`CanonicalStore`]: the system of record. Failures surface as [`StoreError`].
//!
//! # Implementing a Snapshot Tier
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//! use std::time::Duration;
//!
//! use hotset_tier::{Error, SnapshotTier, TtlJitter};
//!
//! struct Snapshots(RwLock<HashMap<String, String>>);
//!
//! impl SnapshotTier<String, String> for Snapshots {
//!     async fn get(&self, key: &String) -> Result<Option<String>, Error> {
//!         let map = self.0.read().map_err(|_| Error::from_message("poisoned"))?;
//!         Ok(map.get(key).cloned())
//!     }
//!
//!     async fn insert(&self, key: &String, value: String, _ttl: Duration) -> Result<(), Error> {
//!         let mut map = self.0.write().map_err(|_| Error::from_message("poisoned"))?;
//!         map.insert(key.clone(), value);
//!         Ok(())
//!     }
//!
//!     async fn batch_insert(&self, entries: HashMap<String, String>, _ttl: TtlJitter) -> Result<(), Error> {
//!         let mut map = self.0.write().map_err(|_| Error::from_message("poisoned"))?;
//!         map.extend(entries);
//!         Ok(())
//!     }
//! }
//! ```

mod entry;
pub mod error;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;
mod ttl;

#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result, StoreError, StoreErrorKind};
#[doc(inline)]
pub use tier::{CanonicalStore, LocalTier, SnapshotTier};
#[doc(inline)]
pub use ttl::TtlJitter;
