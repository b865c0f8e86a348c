//! Simulated run-time environment.

use std::sync::Arc;

use parking_lot::Mutex;
use sn_core::ActivityId;
use sn_tree::{InMemoryTracking, TrackedField, TrackedValue, TrackingAdapter};

/// Tracking store shared by the script runner and the session.
///
/// Scripted `set:` steps write here first, so the value the engine pulls
/// when an attempt ends matches what the learner reported.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRte {
    store: Arc<Mutex<InMemoryTracking>>,
}

impl ScriptedRte {
    /// Record a value as the content would.
    pub fn record(&self, activity_id: &ActivityId, value: TrackedValue) {
        self.store.lock().set_tracked_value(activity_id, value);
    }
}

impl TrackingAdapter for ScriptedRte {
    fn get_tracked_value(&self, activity_id: &ActivityId, field: TrackedField) -> Option<TrackedValue> {
        self.store.lock().get_tracked_value(activity_id, field)
    }

    fn set_tracked_value(&mut self, activity_id: &ActivityId, value: TrackedValue) {
        self.record(activity_id, value);
    }
}
