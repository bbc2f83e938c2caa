//! Metrics sink boundary.
//!
//! Pipeline logic MUST NOT depend on `obs::metrics` directly. All
//! instrumentation flows through `MetricsEvent` and `MetricsSink`; a
//! thread-local scoped override lets tests capture events without touching
//! global state.

use crate::obs::metrics::{self, EventReport};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    PlanBuilt {
        commands: u64,
        waves: u64,
        batches: u64,
    },
    BatchExecuted {
        commands: u64,
        rows: u64,
    },
    ConflictDetected,
    TransactionRolledBack,
    SaveFinished {
        batches: u64,
        rows: u64,
    },
    SaveFailed,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the process-local counter state; used when no
/// scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::PlanBuilt {
                commands,
                waves,
                batches,
            } => metrics::with_state_mut(|m| {
                m.plans_built = m.plans_built.saturating_add(1);
                m.commands_planned = m.commands_planned.saturating_add(commands);
                m.waves_planned = m.waves_planned.saturating_add(waves);
                m.batches_planned = m.batches_planned.saturating_add(batches);
            }),
            MetricsEvent::BatchExecuted { commands: _, rows } => metrics::with_state_mut(|m| {
                m.batches_executed = m.batches_executed.saturating_add(1);
                m.rows_affected = m.rows_affected.saturating_add(rows);
            }),
            MetricsEvent::ConflictDetected => metrics::with_state_mut(|m| {
                m.conflicts = m.conflicts.saturating_add(1);
            }),
            MetricsEvent::TransactionRolledBack => metrics::with_state_mut(|m| {
                m.rollbacks = m.rollbacks.saturating_add(1);
            }),
            MetricsEvent::SaveFinished { .. } => metrics::with_state_mut(|m| {
                m.saves_completed = m.saves_completed.saturating_add(1);
            }),
            MetricsEvent::SaveFailed => metrics::with_state_mut(|m| {
                m.saves_failed = m.saves_failed.saturating_add(1);
            }),
        }
    }
}

/// Record an event through the active sink.
pub(crate) fn record(event: MetricsEvent) {
    SINK_OVERRIDE.with(|cell| {
        if let Some(sink) = *cell.borrow() {
            // SAFETY: the override is installed by `with_sink_override`,
            // which keeps the sink alive until the override is removed.
            unsafe { (*sink).record(event) };
            return;
        }
        GlobalMetricsSink.record(event);
    });
}

/// Run `f` with all events routed to `sink` instead of the global state.
pub fn with_sink_override<R>(sink: &dyn MetricsSink, f: impl FnOnce() -> R) -> R {
    SINK_OVERRIDE.with(|cell| {
        // Erase the borrow's lifetime to match the thread-local's `'static`
        // storage slot; `with_sink_override` clears it before returning, so the
        // pointer never outlives `sink`.
        let ptr: *const dyn MetricsSink =
            unsafe { std::mem::transmute(std::ptr::from_ref(sink)) };
        *cell.borrow_mut() = Some(ptr);
    });
    let result = f();
    SINK_OVERRIDE.with(|cell| {
        *cell.borrow_mut() = None;
    });

    result
}

/// Snapshot the process-local counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::snapshot()
}

/// Reset the process-local counters (tests and long-running hosts).
pub fn metrics_reset_all() {
    metrics::reset();
}
