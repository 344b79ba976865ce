// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and OpenTelemetry metrics for tiered reads, promotions and flushes.

use opentelemetry::logs::Severity;

pub(crate) mod attributes;
pub(crate) mod timing;
pub(crate) mod metrics;
mod recorder;
#[cfg(test)]
pub(crate) mod testing;

#[doc(inline)]
pub use recorder::HotsetTelemetry;

/// Name attached to every event of one orchestrator or scheduler.
pub type HotsetName = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HotsetOperation {
    Get,
    Promote,
    Flush,
}

impl HotsetOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "hotset.get",
            Self::Promote => "hotset.promote",
            Self::Flush => "hotset.flush",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HotsetActivity {
    LocalHit,
    SnapshotHit,
    SnapshotMiss,
    SnapshotTimeout,
    SnapshotError,
    StoreHit,
    StoreMiss,
    StoreError,
    PromotionQueued,
    PromotionDropped,
    PromotionWritten,
    PromotionFailed,
    FlushWritten,
    FlushEmpty,
    FlushSkipped,
    FlushFailed,
}

impl HotsetActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalHit => "hotset.local_hit",
            Self::SnapshotHit => "hotset.snapshot_hit",
            Self::SnapshotMiss => "hotset.snapshot_miss",
            Self::SnapshotTimeout => "hotset.snapshot_timeout",
            Self::SnapshotError => "hotset.snapshot_error",
            Self::StoreHit => "hotset.store_hit",
            Self::StoreMiss => "hotset.store_miss",
            Self::StoreError => "hotset.store_error",
            Self::PromotionQueued => "hotset.promotion_queued",
            Self::PromotionDropped => "hotset.promotion_dropped",
            Self::PromotionWritten => "hotset.promotion_written",
            Self::PromotionFailed => "hotset.promotion_failed",
            Self::FlushWritten => "hotset.flush_written",
            Self::FlushEmpty => "hotset.flush_empty",
            Self::FlushSkipped => "hotset.flush_skipped",
            Self::FlushFailed => "hotset.flush_failed",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::LocalHit
            | Self::SnapshotHit
            | Self::SnapshotMiss
            | Self::StoreHit
            | Self::StoreMiss
            | Self::PromotionQueued
            | Self::PromotionWritten
            | Self::FlushEmpty => Severity::Debug,
            Self::FlushWritten | Self::FlushSkipped => Severity::Info,
            Self::SnapshotTimeout | Self::SnapshotError | Self::PromotionDropped | Self::PromotionFailed => Severity::Warn,
            Self::StoreError | Self::FlushFailed => Severity::Error,
        }
    }
}
