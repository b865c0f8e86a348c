//! Rollup policy definitions.
//!
//! The parent side ([`RollupPolicy`]) decides how children's status combines;
//! the child side ([`RollupControls`]) decides whether a child takes part at
//! all. Aggregation itself lives in `sn-rollup`.

use serde::{Deserialize, Serialize};

use crate::rules::ConditionCombination;

/// Quantifier over the eligible children of an activity.
///
/// JSON: `"all"`, `"any"`, `"none"`, `{"atLeastCount": 2}`,
/// `{"atLeastPercent": 0.75}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildActivitySet {
    /// Every eligible child.
    #[default]
    All,
    /// At least one eligible child.
    Any,
    /// No eligible child.
    None,
    /// At least this many eligible children.
    AtLeastCount(u32),
    /// At least this fraction (0.0..=1.0) of eligible children.
    AtLeastPercent(f64),
}

impl ChildActivitySet {
    /// Whether the quantifier holds when `matching` of `eligible` children
    /// satisfy the predicate.
    ///
    /// Zero eligible children never satisfy any quantifier.
    pub fn holds(self, matching: usize, eligible: usize) -> bool {
        if eligible == 0 {
            return false;
        }
        match self {
            Self::All => matching == eligible,
            Self::Any => matching > 0,
            Self::None => matching == 0,
            Self::AtLeastCount(n) => matching >= n as usize,
            #[allow(clippy::cast_precision_loss)]
            Self::AtLeastPercent(p) => (matching as f64) / (eligible as f64) >= p,
        }
    }
}

/// Conditions a rollup rule can test on each child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollupConditionKind {
    /// The child's primary objective is satisfied.
    Satisfied,
    /// The child's satisfaction status is known.
    ObjectiveStatusKnown,
    /// The child's objective measure is known.
    ObjectiveMeasureKnown,
    /// The child is completed.
    Completed,
    /// The child's completion status is known.
    ActivityProgressKnown,
    /// The child has been attempted.
    Attempted,
    /// The child has used up its attempt limit.
    AttemptLimitExceeded,
    /// Always true.
    Always,
}

/// One clause of a rollup rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupCondition {
    /// What is tested on the child.
    pub condition: RollupConditionKind,
    /// Invert the clause.
    #[serde(default)]
    pub negate: bool,
}

impl RollupCondition {
    /// A plain clause.
    pub fn new(condition: RollupConditionKind) -> Self {
        Self {
            condition,
            negate: false,
        }
    }
}

/// Status a firing rollup rule assigns to the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollupAction {
    /// Parent objective satisfied.
    Satisfied,
    /// Parent objective not satisfied.
    NotSatisfied,
    /// Parent completed.
    Completed,
    /// Parent incomplete.
    Incomplete,
}

impl RollupAction {
    /// Whether this action targets completion rather than satisfaction.
    pub fn is_completion(self) -> bool {
        matches!(self, Self::Completed | Self::Incomplete)
    }
}

/// A rollup rule: "if `child_activity_set` children meet the conditions,
/// apply `action` to the parent".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupRule {
    /// Quantifier over eligible children.
    #[serde(default)]
    pub child_activity_set: ChildActivitySet,
    /// Clauses tested on each child.
    pub conditions: Vec<RollupCondition>,
    /// How clauses combine per child.
    #[serde(default)]
    pub condition_combination: ConditionCombination,
    /// Status applied to the parent.
    pub action: RollupAction,
}

/// How an activity derives its status from its children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollupPolicy {
    /// Quantifier used by the default rollup when no explicit rule targets a
    /// status. `none` disables default rollup for this activity.
    pub consideration: ChildActivitySet,
    /// Explicit rollup rules.
    pub rules: Vec<RollupRule>,
}

impl RollupPolicy {
    /// Explicit rules targeting completion.
    pub fn completion_rules(&self) -> impl Iterator<Item = &RollupRule> {
        self.rules.iter().filter(|r| r.action.is_completion())
    }

    /// Explicit rules targeting satisfaction.
    pub fn satisfaction_rules(&self) -> impl Iterator<Item = &RollupRule> {
        self.rules.iter().filter(|r| !r.action.is_completion())
    }
}

/// Child-side switches deciding whether an activity contributes to its
/// parent's rollup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollupControls {
    /// Untracked activities never contribute.
    pub tracked: bool,
    /// Excluded activities never contribute, whatever their status.
    #[serde(alias = "excluded")]
    pub excluded_from_rollup: bool,
    /// Contribute to the parent's satisfaction.
    pub rollup_objective_satisfied: bool,
    /// Contribute to the parent's completion.
    pub rollup_progress_completion: bool,
    /// Weight (0.0..=1.0) in measure averages.
    pub objective_measure_weight: f64,
}

impl Default for RollupControls {
    fn default() -> Self {
        Self {
            tracked: true,
            excluded_from_rollup: false,
            rollup_objective_satisfied: true,
            rollup_progress_completion: true,
            objective_measure_weight: 1.0,
        }
    }
}

impl RollupControls {
    /// Eligible for the parent's completion rollup.
    pub fn contributes_to_completion(&self) -> bool {
        self.tracked && !self.excluded_from_rollup && self.rollup_progress_completion
    }

    /// Eligible for the parent's satisfaction rollup.
    pub fn contributes_to_satisfaction(&self) -> bool {
        self.tracked && !self.excluded_from_rollup && self.rollup_objective_satisfied
    }
}
