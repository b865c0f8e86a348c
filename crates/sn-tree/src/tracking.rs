//! Tracked values exchanged with the run-time environment.
//!
//! The engine reads and writes a fixed set of fields per activity through
//! [`TrackingAdapter`]. It never interprets `cmi.*` data model semantics;
//! that belongs to the RTE behind the adapter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;
use tracing::{debug, warn};

use crate::activity::{ActivityIdx, CompletionStatus, SuccessStatus};
use crate::tree::ActivityTree;

/// Fields exchanged with the RTE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    /// Completion of the attempt.
    CompletionStatus,
    /// Success of the primary objective.
    SuccessStatus,
    /// Progress toward completion.
    ProgressMeasure,
    /// Scaled score of the primary objective.
    ScoreScaled,
    /// Bookmark inside the content.
    Location,
    /// Time spent in the current attempt.
    AttemptElapsedMs,
}

impl std::str::FromStr for TrackedField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completion" | "completionStatus" => Ok(Self::CompletionStatus),
            "success" | "successStatus" => Ok(Self::SuccessStatus),
            "progress" | "progressMeasure" => Ok(Self::ProgressMeasure),
            "score" | "scoreScaled" => Ok(Self::ScoreScaled),
            "location" => Ok(Self::Location),
            "elapsed" | "attemptElapsedMs" => Ok(Self::AttemptElapsedMs),
            other => Err(format!("unknown tracked field: {other}")),
        }
    }
}

/// A value for one [`TrackedField`].
///
/// JSON: `{"field": "progressMeasure", "value": 0.5}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum TrackedValue {
    /// `cmi.completion_status`.
    CompletionStatus(CompletionStatus),
    /// `cmi.success_status`.
    SuccessStatus(SuccessStatus),
    /// `cmi.progress_measure`, 0.0..=1.0.
    ProgressMeasure(f64),
    /// `cmi.score.scaled`, -1.0..=1.0.
    ScoreScaled(f64),
    /// `cmi.location`.
    Location(String),
    /// Elapsed time of the current attempt in milliseconds.
    AttemptElapsedMs(u64),
}

impl TrackedValue {
    /// The field this value belongs to.
    pub fn field(&self) -> TrackedField {
        match self {
            Self::CompletionStatus(_) => TrackedField::CompletionStatus,
            Self::SuccessStatus(_) => TrackedField::SuccessStatus,
            Self::ProgressMeasure(_) => TrackedField::ProgressMeasure,
            Self::ScoreScaled(_) => TrackedField::ScoreScaled,
            Self::Location(_) => TrackedField::Location,
            Self::AttemptElapsedMs(_) => TrackedField::AttemptElapsedMs,
        }
    }

    /// Parse a textual value for `field`.
    pub fn parse(field: TrackedField, value: &str) -> Result<Self, String> {
        let number = || {
            value
                .parse::<f64>()
                .map_err(|e| format!("invalid number {value:?}: {e}"))
        };
        Ok(match field {
            TrackedField::CompletionStatus => Self::CompletionStatus(value.parse()?),
            TrackedField::SuccessStatus => Self::SuccessStatus(value.parse()?),
            TrackedField::ProgressMeasure => Self::ProgressMeasure(number()?),
            TrackedField::ScoreScaled => Self::ScoreScaled(number()?),
            TrackedField::Location => Self::Location(value.to_string()),
            TrackedField::AttemptElapsedMs => Self::AttemptElapsedMs(
                value
                    .parse()
                    .map_err(|e| format!("invalid duration {value:?}: {e}"))?,
            ),
        })
    }
}

/// The RTE side of tracking.
pub trait TrackingAdapter: Send {
    /// Read the RTE's current value of `field`, if it has one.
    fn get_tracked_value(&self, activity_id: &ActivityId, field: TrackedField) -> Option<TrackedValue>;

    /// Push a value to the RTE.
    fn set_tracked_value(&mut self, activity_id: &ActivityId, value: TrackedValue);
}

/// A [`TrackingAdapter`] backed by a hash map; used by tests and the CLI.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTracking {
    values: HashMap<(ActivityId, TrackedField), TrackedValue>,
}

impl InMemoryTracking {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TrackingAdapter for InMemoryTracking {
    fn get_tracked_value(&self, activity_id: &ActivityId, field: TrackedField) -> Option<TrackedValue> {
        self.values.get(&(activity_id.clone(), field)).cloned()
    }

    fn set_tracked_value(&mut self, activity_id: &ActivityId, value: TrackedValue) {
        let _ = self.values.insert((activity_id.clone(), value.field()), value);
    }
}

impl ActivityTree {
    /// Apply a tracked value to an activity's state.
    ///
    /// Out-of-range numbers are rejected with a warning. A score on a primary
    /// objective that is satisfied by measure also decides the success status.
    /// Returns whether the activity's state changed.
    pub fn apply_tracked_value(&mut self, idx: ActivityIdx, value: &TrackedValue) -> bool {
        let activity = self.get_mut(idx);
        let before = activity.state.clone();
        match value {
            TrackedValue::CompletionStatus(status) => activity.state.completion_status = *status,
            TrackedValue::SuccessStatus(status) => {
                activity.state.success_status = *status;
                let _ = activity.evaluate_satisfied_by_measure();
            }
            TrackedValue::ProgressMeasure(measure) => {
                if !(0.0..=1.0).contains(measure) {
                    warn!(activity_id = %activity.id, measure, "progress measure out of range, ignoring");
                    return false;
                }
                activity.state.progress_measure = Some(*measure);
            }
            TrackedValue::ScoreScaled(score) => {
                if !(-1.0..=1.0).contains(score) {
                    warn!(activity_id = %activity.id, score, "scaled score out of range, ignoring");
                    return false;
                }
                activity.state.objective_measure = Some(*score);
                let _ = activity.evaluate_satisfied_by_measure();
            }
            TrackedValue::Location(location) => activity.state.location = Some(location.clone()),
            TrackedValue::AttemptElapsedMs(ms) => activity.state.attempt_elapsed_ms = Some(*ms),
        }
        let changed = activity.state != before;
        if changed {
            debug!(activity_id = %activity.id, field = ?value.field(), "tracked value applied");
        }
        changed
    }

    /// Values the RTE should see when `idx` is delivered.
    ///
    /// Both statuses are always sent, so a fresh attempt overwrites whatever
    /// the RTE kept from the previous one.
    pub fn tracked_values(&self, idx: ActivityIdx) -> Vec<TrackedValue> {
        let state = &self.get(idx).state;
        let mut values = vec![
            TrackedValue::CompletionStatus(state.completion_status),
            TrackedValue::SuccessStatus(state.success_status),
        ];
        if let Some(location) = &state.location {
            values.push(TrackedValue::Location(location.clone()));
        }
        values
    }
}

/// Fields read back from the RTE when an attempt ends.
pub const SYNCED_FIELDS: [TrackedField; 6] = [
    TrackedField::CompletionStatus,
    TrackedField::SuccessStatus,
    TrackedField::ProgressMeasure,
    TrackedField::ScoreScaled,
    TrackedField::Location,
    TrackedField::AttemptElapsedMs,
];
