// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::logs::Severity;
use opentelemetry::metrics::MeterProvider;

use crate::telemetry::metrics::Instruments;
use crate::telemetry::{HotsetActivity, HotsetName, HotsetOperation, attributes};

#[derive(Debug)]
struct TelemetryInner {
    logging_enabled: bool,
    instruments: Option<Instruments>,
}

/// Telemetry sink shared by an orchestrator and its scheduler.
///
/// Emits `tracing` events when logging is enabled and OpenTelemetry metrics when a meter
/// provider is supplied. The default records nothing.
#[derive(Clone, Debug)]
pub struct HotsetTelemetry {
    inner: Arc<TelemetryInner>,
}

impl Default for HotsetTelemetry {
    fn default() -> Self {
        Self::new(false, None)
    }
}

impl HotsetTelemetry {
    /// Creates a telemetry sink.
    ///
    /// # Examples
    ///
    /// ```
    /// use hotset::HotsetTelemetry;
    ///
    /// // Logs only.
    /// let telemetry = HotsetTelemetry::new(true, None);
    /// ```
    #[must_use]
    pub fn new(logging_enabled: bool, meter_provider: Option<&dyn MeterProvider>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                logging_enabled,
                instruments: meter_provider.map(Instruments::new),
            }),
        }
    }

    pub(crate) fn record(&self, name: HotsetName, operation: HotsetOperation, activity: HotsetActivity, duration: Option<Duration>) {
        self.record_metrics(name, operation, activity, duration);

        if self.inner.logging_enabled {
            Self::emit(name, operation, activity, duration, None);
        }
    }

    /// Like [`record`](Self::record), with the failure attached to the log event.
    pub(crate) fn record_failure(
        &self,
        name: HotsetName,
        operation: HotsetOperation,
        activity: HotsetActivity,
        duration: Option<Duration>,
        reason: &dyn Display,
    ) {
        self.record_metrics(name, operation, activity, duration);

        if self.inner.logging_enabled {
            Self::emit(name, operation, activity, duration, Some(reason));
        }
    }

    pub(crate) fn record_tracked(&self, name: HotsetName, tracked: u64) {
        if let Some(instruments) = &self.inner.instruments {
            instruments
                .tracked_keys
                .record(tracked, &[KeyValue::new(attributes::HOTSET_NAME, name)]);
        }
    }

    fn record_metrics(&self, name: HotsetName, operation: HotsetOperation, activity: HotsetActivity, duration: Option<Duration>) {
        let Some(instruments) = &self.inner.instruments else {
            return;
        };

        let attrs = [
            KeyValue::new(attributes::HOTSET_NAME, name),
            KeyValue::new(attributes::HOTSET_OPERATION_NAME, operation.as_str()),
            KeyValue::new(attributes::HOTSET_ACTIVITY_NAME, activity.as_str()),
        ];

        instruments.events.add(1, &attrs);
        if let Some(duration) = duration {
            instruments.durations.record(duration.as_secs_f64(), &attrs);
        }
    }

    fn emit(name: HotsetName, operation: HotsetOperation, activity: HotsetActivity, duration: Option<Duration>, reason: Option<&dyn Display>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());
        let reason = reason.map(ToString::to_string);

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    hotset.name = name,
                    hotset.operation = op,
                    hotset.activity = act,
                    hotset.duration_ns = ?duration_ns,
                    hotset.reason = ?reason,
                    "hotset.event"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Warn => emit_event!(warn),
            Severity::Info => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::telemetry::testing::{LogCapture, MetricTester};

    #[test]
    fn metrics_record_emits_correct_attributes() {
        let tester = MetricTester::new();
        let telemetry = HotsetTelemetry::new(false, Some(tester.meter_provider()));

        telemetry.record("posts", HotsetOperation::Get, HotsetActivity::LocalHit, Some(Duration::from_millis(5)));

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::HOTSET_NAME, "posts"),
            KeyValue::new(attributes::HOTSET_OPERATION_NAME, HotsetOperation::Get.as_str()),
            KeyValue::new(attributes::HOTSET_ACTIVITY_NAME, HotsetActivity::LocalHit.as_str()),
        ]);
    }

    #[test]
    fn metrics_record_tracked_emits_name() {
        let tester = MetricTester::new();
        let telemetry = HotsetTelemetry::new(false, Some(tester.meter_provider()));

        telemetry.record_tracked("tracked_test", 42);

        tester.assert_attributes_contain(&[KeyValue::new(attributes::HOTSET_NAME, "tracked_test")]);
    }

    #[test]
    fn logs_emit_contains_all_fields_and_values() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        HotsetTelemetry::emit(
            "my_hotset",
            HotsetOperation::Flush,
            HotsetActivity::FlushFailed,
            Some(Duration::from_nanos(12345)),
            Some(&"store offline"),
        );

        capture.assert_contains(attributes::HOTSET_NAME);
        capture.assert_contains(attributes::HOTSET_OPERATION_NAME);
        capture.assert_contains(attributes::HOTSET_ACTIVITY_NAME);
        capture.assert_contains(attributes::HOTSET_DURATION_NAME);
        capture.assert_contains(attributes::HOTSET_REASON_NAME);
        capture.assert_contains(attributes::HOTSET_EVENT_NAME);

        capture.assert_contains("my_hotset");
        capture.assert_contains(HotsetOperation::Flush.as_str());
        capture.assert_contains(HotsetActivity::FlushFailed.as_str());
        capture.assert_contains("store offline");
    }

    #[test]
    fn logs_emit_at_correct_severity_levels() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        HotsetTelemetry::emit("hotset", HotsetOperation::Get, HotsetActivity::StoreError, None, None);
        capture.assert_contains("ERROR");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        HotsetTelemetry::emit("hotset", HotsetOperation::Get, HotsetActivity::SnapshotTimeout, None, None);
        capture.assert_contains("WARN");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        HotsetTelemetry::emit("hotset", HotsetOperation::Flush, HotsetActivity::FlushWritten, None, None);
        capture.assert_contains("INFO");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        HotsetTelemetry::emit("hotset", HotsetOperation::Get, HotsetActivity::LocalHit, None, None);
        capture.assert_contains("DEBUG");
    }

    #[test]
    fn telemetry_disabled_emits_nothing() {
        let telemetry = HotsetTelemetry::default();

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("hotset", HotsetOperation::Get, HotsetActivity::LocalHit, Some(Duration::from_secs(1)));
        telemetry.record_failure("hotset", HotsetOperation::Flush, HotsetActivity::FlushFailed, None, &"boom");
        telemetry.record_tracked("hotset", 3);

        assert!(capture.output().is_empty());
    }
}
