//! Metrics sink boundary.
//!
//! Core storage logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    Load {
        bucket: &'static str,
        rows: u64,
    },
    Save {
        bucket: &'static str,
    },
    Delete {
        bucket: &'static str,
    },
    IndexDelta {
        bucket: &'static str,
        inserts: u64,
        removes: u64,
    },
    UniqueViolation {
        bucket: &'static str,
        index: &'static str,
    },
    SequenceAdvance {
        value: u64,
    },
    SchemaMigrated {
        path: &'static str,
        from: u32,
        to: u32,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::Load { bucket, rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.load_calls = m.ops.load_calls.saturating_add(1);
                    m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                    let entry = m.buckets.entry(bucket.to_string()).or_default();
                    entry.load_calls = entry.load_calls.saturating_add(1);
                    entry.rows_loaded = entry.rows_loaded.saturating_add(rows);
                });
            }

            MetricsEvent::Save { bucket } => {
                metrics::with_state_mut(|m| {
                    m.ops.save_calls = m.ops.save_calls.saturating_add(1);
                    let entry = m.buckets.entry(bucket.to_string()).or_default();
                    entry.save_calls = entry.save_calls.saturating_add(1);
                });
            }

            MetricsEvent::Delete { bucket } => {
                metrics::with_state_mut(|m| {
                    m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                    let entry = m.buckets.entry(bucket.to_string()).or_default();
                    entry.delete_calls = entry.delete_calls.saturating_add(1);
                });
            }

            MetricsEvent::IndexDelta {
                bucket,
                inserts,
                removes,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_inserts = m.ops.index_inserts.saturating_add(inserts);
                    m.ops.index_removes = m.ops.index_removes.saturating_add(removes);
                    let entry = m.buckets.entry(bucket.to_string()).or_default();
                    entry.index_inserts = entry.index_inserts.saturating_add(inserts);
                    entry.index_removes = entry.index_removes.saturating_add(removes);
                });
            }

            MetricsEvent::UniqueViolation { bucket, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.unique_violations = m.ops.unique_violations.saturating_add(1);
                    let entry = m.buckets.entry(bucket.to_string()).or_default();
                    entry.unique_violations = entry.unique_violations.saturating_add(1);
                });
            }

            MetricsEvent::SequenceAdvance { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.sequence_advances = m.ops.sequence_advances.saturating_add(1);
                });
            }

            MetricsEvent::SchemaMigrated { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.schema_migrations = m.ops.schema_migrations.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous sink is restored on every exit path, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
