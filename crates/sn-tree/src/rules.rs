//! Sequencing rule definitions.
//!
//! A rule is an ordered list of condition clauses, a combination operator and
//! an action. The action type is a parameter so that a post-condition action
//! can never end up in a pre-condition rule set. Evaluation lives in
//! `sn-rules`; this module only describes the data.

use serde::{Deserialize, Serialize};

/// How the clauses of a rule combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionCombination {
    /// Every clause must hold (logical AND).
    #[default]
    All,
    /// At least one clause must hold (logical OR).
    Any,
}

/// The closed set of conditions a sequencing rule clause can test.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "camelCase")]
pub enum RuleConditionKind {
    /// The objective is satisfied.
    Satisfied,
    /// The objective's satisfaction status is known.
    ObjectiveStatusKnown,
    /// The objective's normalized measure is known.
    ObjectiveMeasureKnown,
    /// The objective's measure is strictly greater than `threshold`.
    ObjectiveMeasureGreaterThan {
        /// Comparison value in -1.0..=1.0.
        threshold: f64,
    },
    /// The objective's measure is strictly less than `threshold`.
    ObjectiveMeasureLessThan {
        /// Comparison value in -1.0..=1.0.
        threshold: f64,
    },
    /// The activity is completed.
    Completed,
    /// The activity's completion status is known.
    ActivityProgressKnown,
    /// The activity has been attempted at least once.
    Attempted,
    /// The activity has used up its attempt limit.
    AttemptLimitExceeded,
    /// The current attempt ran past its duration limit.
    TimeLimitExceeded,
    /// Always true.
    Always,
}

impl RuleConditionKind {
    /// Whether this condition reads objective state (and so honors
    /// `referenced_objective`).
    pub fn reads_objective(&self) -> bool {
        matches!(
            self,
            Self::Satisfied
                | Self::ObjectiveStatusKnown
                | Self::ObjectiveMeasureKnown
                | Self::ObjectiveMeasureGreaterThan { .. }
                | Self::ObjectiveMeasureLessThan { .. }
        )
    }
}

/// One clause of a sequencing rule.
///
/// JSON shape: `{"condition": "objectiveMeasureGreaterThan", "threshold": 0.6,
/// "negate": true, "referencedObjective": "obj-2"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// What is tested.
    #[serde(flatten)]
    pub kind: RuleConditionKind,
    /// Invert the clause.
    #[serde(default)]
    pub negate: bool,
    /// Objective to read instead of the activity's primary objective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_objective: Option<String>,
}

impl RuleCondition {
    /// A plain clause on the primary objective.
    pub fn new(kind: RuleConditionKind) -> Self {
        Self {
            kind,
            negate: false,
            referenced_objective: None,
        }
    }

    /// The same clause, inverted.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// The same clause, reading a named objective.
    #[must_use]
    pub fn on_objective(mut self, objective_id: impl Into<String>) -> Self {
        self.referenced_objective = Some(objective_id.into());
        self
    }
}

/// Actions of pre-condition rules, evaluated before an activity is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreConditionAction {
    /// Pass over the activity during flow navigation.
    Skip,
    /// The activity cannot be entered at all.
    Disabled,
    /// The activity cannot be the target of a choice request.
    HiddenFromChoice,
    /// Forward flow traversal ends at this activity.
    StopForwardTraversal,
}

/// Actions of post-condition rules, evaluated after an attempt ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostConditionAction {
    /// End the parent's attempt as well.
    ExitParent,
    /// End every attempt and terminate the session.
    ExitAll,
    /// Begin a new attempt on this activity.
    Retry,
    /// Begin a new attempt on the whole course.
    RetryAll,
    /// Replace the pending request with continue.
    Continue,
    /// Replace the pending request with previous.
    Previous,
}

/// Actions of exit-condition rules, evaluated on active ancestors when an
/// attempt ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitConditionAction {
    /// End this activity's attempt.
    Exit,
}

/// A condition/action pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencingRule<A> {
    /// Clauses in declaration order.
    pub conditions: Vec<RuleCondition>,
    /// How clauses combine.
    #[serde(default)]
    pub combination: ConditionCombination,
    /// What happens when the rule fires.
    pub action: A,
}

impl<A> SequencingRule<A> {
    /// Rule firing when every clause holds.
    pub fn all(conditions: Vec<RuleCondition>, action: A) -> Self {
        Self {
            conditions,
            combination: ConditionCombination::All,
            action,
        }
    }

    /// Rule firing when any clause holds.
    pub fn any(conditions: Vec<RuleCondition>, action: A) -> Self {
        Self {
            conditions,
            combination: ConditionCombination::Any,
            action,
        }
    }
}

/// Every sequencing rule attached to one activity, grouped by type and kept
/// in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequencingRules {
    /// Evaluated before the activity is entered.
    pub pre_condition: Vec<SequencingRule<PreConditionAction>>,
    /// Evaluated after an attempt on the activity ends.
    pub post_condition: Vec<SequencingRule<PostConditionAction>>,
    /// Evaluated on the activity while a descendant's attempt ends.
    pub exit_condition: Vec<SequencingRule<ExitConditionAction>>,
}

impl SequencingRules {
    /// Whether no rules are defined.
    pub fn is_empty(&self) -> bool {
        self.pre_condition.is_empty()
            && self.post_condition.is_empty()
            && self.exit_condition.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_json_is_flat() {
        let cond = RuleCondition::new(RuleConditionKind::ObjectiveMeasureGreaterThan {
            threshold: 0.5,
        })
        .negated()
        .on_objective("obj-2");
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["condition"], "objectiveMeasureGreaterThan");
        assert_eq!(json["threshold"], 0.5);
        assert_eq!(json["negate"], true);
        assert_eq!(json["referencedObjective"], "obj-2");
    }

    #[test]
    fn rule_parses_with_default_combination() {
        let rule: SequencingRule<PreConditionAction> = serde_json::from_str(
            r#"{"conditions": [{"condition": "satisfied"}], "action": "skip"}"#,
        )
        .unwrap();
        assert_eq!(rule.combination, ConditionCombination::All);
        assert_eq!(rule.action, PreConditionAction::Skip);
        assert!(!rule.conditions[0].negate);
    }

    #[test]
    fn post_action_rejected_in_pre_rule() {
        let parsed = serde_json::from_str::<SequencingRule<PreConditionAction>>(
            r#"{"conditions": [], "action": "exitParent"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn reads_objective() {
        assert!(RuleConditionKind::Satisfied.reads_objective());
        assert!(!RuleConditionKind::Attempted.reads_objective());
    }
}
