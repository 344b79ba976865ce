// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Hot-key detection with the HeavyKeeper algorithm.
//!
//! A [`FrequencySketch`] estimates how often each key was seen using a fixed amount of
//! memory. A [`TopKTracker`] keeps the `k` keys with the largest estimates. [`HeavyKeeper`]
//! ties the two together: every access is recorded and its estimate offered to the tracker,
//! and the tracked keys are the hot set.
//!
//! ```
//! use hotset_sketch::HeavyKeeper;
//!
//! let detector = HeavyKeeper::<&str>::builder().width(1_000).depth(3).k(10).build()?;
//!
//! for _ in 0..10 {
//!     detector.add(&"apple");
//! }
//! detector.add(&"pear");
//!
//! assert!(detector.is_hot(&"apple"));
//! assert_eq!(detector.top_k()[0].key(), &"apple");
//! # Ok::<(), hotset_sketch::ConfigError>(())
//! ```
//!
//! # Concurrency
//!
//! All types are `Send + Sync` and every operation takes `&self`. Sketch rows are locked
//! independently; the tracker is guarded by a single reader-writer lock.

mod error;
mod heavy_keeper;
mod rnd;
mod sketch;
mod top_k;

#[doc(inline)]
pub use error::ConfigError;
#[doc(inline)]
pub use heavy_keeper::{HeavyKeeper, HeavyKeeperBuilder};
#[doc(inline)]
pub use sketch::FrequencySketch;
#[doc(inline)]
pub use top_k::{TopKItem, TopKTracker};
