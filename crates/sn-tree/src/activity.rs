//! Activity nodes and their tracked state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sn_core::ActivityId;

use crate::rollup::{RollupControls, RollupPolicy};
use crate::rules::SequencingRules;

/// Index of an activity inside its tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityIdx(pub(crate) usize);

impl ActivityIdx {
    /// Position in the arena. Arena order is the pre-order of the tree.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Completion status of an activity attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,
    /// The learner finished the activity.
    Completed,
    /// The learner started but has not finished.
    Incomplete,
}

impl CompletionStatus {
    /// Whether the status is known.
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Completed => write!(f, "completed"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl std::str::FromStr for CompletionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" | "not attempted" => Ok(Self::Unknown),
            "completed" => Ok(Self::Completed),
            "incomplete" => Ok(Self::Incomplete),
            other => Err(format!("unknown completion status: {other}")),
        }
    }
}

/// Success status of the activity's primary objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,
    /// Objective satisfied.
    Passed,
    /// Objective not satisfied.
    Failed,
}

impl SuccessStatus {
    /// Map to objective satisfaction (`None` when unknown).
    pub fn satisfied(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Passed => Some(true),
            Self::Failed => Some(false),
        }
    }
}

impl std::fmt::Display for SuccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SuccessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown success status: {other}")),
        }
    }
}

/// Effective control-mode flags, resolved at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMode {
    /// Children may be targeted by choice requests.
    pub choice: bool,
    /// An active attempt may be left by choosing outside it.
    pub choice_exit: bool,
    /// Continue/previous may move between children.
    pub flow: bool,
    /// Backward movement between children is forbidden.
    pub forward_only: bool,
}

impl Default for ControlMode {
    fn default() -> Self {
        Self {
            choice: true,
            choice_exit: true,
            flow: true,
            forward_only: false,
        }
    }
}

/// Attempt and duration limits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitConditions {
    /// Maximum number of attempts (`None` or 0 = unlimited).
    pub attempt_limit: Option<u32>,
    /// Maximum duration of one attempt in milliseconds.
    pub attempt_duration_limit_ms: Option<u64>,
}

/// Configuration of the primary objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrimaryObjective {
    /// Objective identifier used by rule conditions.
    pub id: Option<String>,
    /// Derive satisfaction from the measure instead of reported status.
    pub satisfied_by_measure: bool,
    /// Passing threshold when satisfied by measure (-1.0..=1.0).
    pub min_normalized_measure: f64,
}

impl Default for PrimaryObjective {
    fn default() -> Self {
        Self {
            id: None,
            satisfied_by_measure: false,
            min_normalized_measure: 1.0,
        }
    }
}

/// Runtime state of a secondary objective.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveState {
    /// Satisfaction, `None` when unknown.
    pub satisfied: Option<bool>,
    /// Normalized measure, `None` when unknown.
    pub measure: Option<f64>,
}

/// A named secondary objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    /// Objective identifier.
    pub id: String,
    /// Current state.
    #[serde(default)]
    pub state: ObjectiveState,
}

/// Tracked state of an activity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedState {
    /// Number of attempts begun. Never decreases within a session.
    pub attempt_count: u32,
    /// Completion of the current or last attempt.
    pub completion_status: CompletionStatus,
    /// Success of the primary objective.
    pub success_status: SuccessStatus,
    /// Progress measure in 0.0..=1.0.
    pub progress_measure: Option<f64>,
    /// Scaled score of the primary objective in -1.0..=1.0.
    pub objective_measure: Option<f64>,
    /// Opaque RTE bookmark.
    pub location: Option<String>,
    /// Elapsed time of the current attempt, supplied by the RTE.
    pub attempt_elapsed_ms: Option<u64>,
    /// When the current attempt began.
    pub attempt_started_at: Option<DateTime<Utc>>,
}

/// A node of the activity tree.
#[derive(Clone, Debug)]
pub struct Activity {
    /// Manifest identifier.
    pub id: ActivityId,
    /// Display title.
    pub title: String,
    /// Parent cluster, `None` for the root.
    pub parent: Option<ActivityIdx>,
    /// Children in manifest order.
    pub children: Vec<ActivityIdx>,
    /// Depth below the root (root = 0).
    pub depth: usize,
    /// Resource launched for this activity (leaves only).
    pub resource_ref: Option<String>,
    /// Whether the activity may be shown and chosen.
    pub is_visible: bool,
    /// An attempt on this activity is in progress.
    pub is_active: bool,
    /// The activity's attempt is suspended.
    pub is_suspended: bool,
    /// Effective control-mode flags.
    pub control_mode: ControlMode,
    /// Attached sequencing rules.
    pub sequencing_rules: SequencingRules,
    /// How this activity aggregates its children.
    pub rollup_policy: RollupPolicy,
    /// How this activity contributes to its parent.
    pub rollup_controls: RollupControls,
    /// Attempt and duration limits.
    pub limits: LimitConditions,
    /// Primary objective configuration.
    pub primary_objective: PrimaryObjective,
    /// Secondary objectives.
    pub objectives: Vec<Objective>,
    /// Tracked state.
    pub state: TrackedState,
}

impl Activity {
    /// Whether the activity has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Only leaves with a resource can be delivered.
    pub fn is_launchable(&self) -> bool {
        self.is_leaf() && self.resource_ref.is_some()
    }

    /// Satisfaction of the primary objective.
    pub fn objective_satisfied(&self) -> Option<bool> {
        self.state.success_status.satisfied()
    }

    /// At least one attempt has begun.
    pub fn is_attempted(&self) -> bool {
        self.state.attempt_count > 0
    }

    /// The attempt limit is set and used up.
    pub fn attempt_limit_exceeded(&self) -> bool {
        match self.limits.attempt_limit {
            Some(limit) if limit > 0 => self.state.attempt_count >= limit,
            _ => false,
        }
    }

    /// The externally reported attempt duration exceeds the limit.
    pub fn time_limit_exceeded(&self) -> bool {
        match (
            self.limits.attempt_duration_limit_ms,
            self.state.attempt_elapsed_ms,
        ) {
            (Some(limit), Some(elapsed)) => elapsed > limit,
            _ => false,
        }
    }

    /// Whether `objective_id` names the primary objective.
    pub fn is_primary_objective(&self, objective_id: &str) -> bool {
        self.primary_objective.id.as_deref() == Some(objective_id)
    }

    /// Look up a secondary objective.
    pub fn objective(&self, objective_id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == objective_id)
    }

    /// Mutable lookup of a secondary objective.
    pub fn objective_mut(&mut self, objective_id: &str) -> Option<&mut Objective> {
        self.objectives.iter_mut().find(|o| o.id == objective_id)
    }

    /// Clear attempt progress (completion, progress measure, elapsed time).
    pub fn reset_attempt_progress(&mut self) {
        self.state.completion_status = CompletionStatus::Unknown;
        self.state.progress_measure = None;
        self.state.attempt_elapsed_ms = None;
    }

    /// Clear attempt progress and every objective's status.
    pub fn reset_tracking(&mut self) {
        self.reset_attempt_progress();
        self.state.success_status = SuccessStatus::Unknown;
        self.state.objective_measure = None;
        self.state.location = None;
        for objective in &mut self.objectives {
            objective.state = ObjectiveState::default();
        }
    }

    /// Apply satisfied-by-measure to the primary objective.
    ///
    /// Returns `true` if the success status changed.
    pub fn evaluate_satisfied_by_measure(&mut self) -> bool {
        if !self.primary_objective.satisfied_by_measure {
            return false;
        }
        let Some(measure) = self.state.objective_measure else {
            return false;
        };
        let status = if measure >= self.primary_objective.min_normalized_measure {
            SuccessStatus::Passed
        } else {
            SuccessStatus::Failed
        };
        let changed = self.state.success_status != status;
        self.state.success_status = status;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ActivitySpec;
    use crate::builder::TreeBuilder;

    fn single(spec: ActivitySpec) -> Activity {
        let tree = TreeBuilder::default().build_root(spec).unwrap();
        tree.get(tree.root()).clone()
    }

    #[test]
    fn status_parsing() {
        assert_eq!("completed".parse(), Ok(CompletionStatus::Completed));
        assert_eq!("not attempted".parse(), Ok(CompletionStatus::Unknown));
        assert_eq!("failed".parse(), Ok(SuccessStatus::Failed));
        assert!("done".parse::<CompletionStatus>().is_err());
    }

    #[test]
    fn success_maps_to_satisfaction() {
        assert_eq!(SuccessStatus::Passed.satisfied(), Some(true));
        assert_eq!(SuccessStatus::Failed.satisfied(), Some(false));
        assert_eq!(SuccessStatus::Unknown.satisfied(), None);
    }

    #[test]
    fn attempt_limit() {
        let mut a = single(ActivitySpec::leaf("a").with_attempt_limit(2));
        assert!(!a.attempt_limit_exceeded());
        a.state.attempt_count = 2;
        assert!(a.attempt_limit_exceeded());
    }

    #[test]
    fn zero_attempt_limit_is_unlimited() {
        let mut a = single(ActivitySpec::leaf("a").with_attempt_limit(0));
        a.state.attempt_count = 50;
        assert!(!a.attempt_limit_exceeded());
    }

    #[test]
    fn time_limit_uses_reported_elapsed_time() {
        let mut a = single(ActivitySpec::leaf("a"));
        a.limits.attempt_duration_limit_ms = Some(1_000);
        assert!(!a.time_limit_exceeded());
        a.state.attempt_elapsed_ms = Some(1_500);
        assert!(a.time_limit_exceeded());
    }

    #[test]
    fn satisfied_by_measure() {
        let mut a = single(ActivitySpec::leaf("a").satisfied_by_measure(0.6));
        a.state.objective_measure = Some(0.7);
        assert!(a.evaluate_satisfied_by_measure());
        assert_eq!(a.state.success_status, SuccessStatus::Passed);
        a.state.objective_measure = Some(0.2);
        assert!(a.evaluate_satisfied_by_measure());
        assert_eq!(a.state.success_status, SuccessStatus::Failed);
        assert!(!a.evaluate_satisfied_by_measure());
    }

    #[test]
    fn reset_tracking_keeps_attempt_count() {
        let mut a = single(ActivitySpec::leaf("a"));
        a.state.attempt_count = 3;
        a.state.completion_status = CompletionStatus::Completed;
        a.state.success_status = SuccessStatus::Passed;
        a.reset_tracking();
        assert_eq!(a.state.attempt_count, 3);
        assert_eq!(a.state.completion_status, CompletionStatus::Unknown);
        assert_eq!(a.state.success_status, SuccessStatus::Unknown);
    }
}
