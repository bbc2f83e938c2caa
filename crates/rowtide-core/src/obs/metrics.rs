//! Process-local metric counters. State is thread-local: one save
//! operation runs on a single logical thread of control.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

thread_local! {
    static STATE: RefCell<EventReport> = const { RefCell::new(EventReport::new()) };
}

///
/// EventReport
/// Point-in-time snapshot of the pipeline counters.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub plans_built: u64,
    pub commands_planned: u64,
    pub waves_planned: u64,
    pub batches_planned: u64,
    pub batches_executed: u64,
    pub rows_affected: u64,
    pub conflicts: u64,
    pub rollbacks: u64,
    pub saves_completed: u64,
    pub saves_failed: u64,
}

impl EventReport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plans_built: 0,
            commands_planned: 0,
            waves_planned: 0,
            batches_planned: 0,
            batches_executed: 0,
            rows_affected: 0,
            conflicts: 0,
            rollbacks: 0,
            saves_completed: 0,
            saves_failed: 0,
        }
    }
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventReport) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

pub(crate) fn snapshot() -> EventReport {
    STATE.with(|state| *state.borrow())
}

pub(crate) fn reset() {
    STATE.with(|state| *state.borrow_mut() = EventReport::new());
}
