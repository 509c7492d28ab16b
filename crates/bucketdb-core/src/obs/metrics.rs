use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for storage operations.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub buckets: BTreeMap<String, BucketCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventOps {
    // Entrypoints
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,

    // Rows touched
    pub rows_loaded: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,

    pub sequence_advances: u64,
    pub schema_migrations: u64,
}

///
/// BucketCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BucketCounters {
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the metrics state.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventReport {
    pub ops: EventOps,
    pub buckets: BTreeMap<String, BucketCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn report() -> EventReport {
    EVENT_STATE.with(|m| {
        let m = m.borrow();
        EventReport {
            ops: m.ops.clone(),
            buckets: m.buckets.clone(),
        }
    })
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}
