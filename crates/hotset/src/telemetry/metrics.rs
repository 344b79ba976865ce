// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::InstrumentationScope;
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};

const METER_NAME: &str = "hotset";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

/// Every OpenTelemetry instrument the crate reports to.
#[derive(Debug)]
pub(crate) struct Instruments {
    /// One increment per read outcome, promotion step or flush.
    pub events: Counter<u64>,
    /// Seconds spent in tier calls and flushes.
    pub durations: Histogram<f64>,
    /// Size of the hot set seen by the last flush.
    pub tracked_keys: Gauge<u64>,
}

impl Instruments {
    pub(crate) fn new(provider: &dyn MeterProvider) -> Self {
        let meter = provider.meter_with_scope(
            InstrumentationScope::builder(METER_NAME)
                .with_version(VERSION)
                .with_schema_url(SCHEMA_URL)
                .build(),
        );

        Self {
            events: meter
                .u64_counter("hotset.event.count")
                .with_description("Tiered read, promotion and flush events")
                .with_unit("{event}")
                .build(),
            durations: meter
                .f64_histogram("hotset.operation.duration")
                .with_description("Duration of tier calls and flushes")
                .with_unit("s")
                .build(),
            tracked_keys: meter
                .u64_gauge("hotset.tracked_keys")
                .with_description("Number of keys currently considered hot")
                .with_unit("{key}")
                .build(),
        }
    }
}
