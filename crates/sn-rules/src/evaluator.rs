//! Sequencing rule evaluator.
//!
//! Conditions are three-valued: a clause about a status that is not known yet
//! evaluates to unknown (`None`), `negate` leaves unknown as unknown, and a
//! rule fires only when its combination is definitely true.

use std::fmt;

use sn_tree::{
    Activity, ConditionCombination, ExitConditionAction, PostConditionAction, PreConditionAction,
    RuleCondition, RuleConditionKind, SequencingRule,
};
use tracing::{debug, warn};

use crate::errors::RuleEvaluationError;

/// Which rule list is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Before entering an activity.
    PreCondition,
    /// After an attempt on an activity ends.
    PostCondition,
    /// On an active ancestor while an attempt ends.
    ExitCondition,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreCondition => write!(f, "preCondition"),
            Self::PostCondition => write!(f, "postCondition"),
            Self::ExitCondition => write!(f, "exitCondition"),
        }
    }
}

/// The rule that decided an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleMatch<A> {
    /// Action of the matching rule.
    pub action: A,
    /// Position of the matching rule in declaration order.
    pub rule_index: usize,
}

/// Objective state as seen by a clause.
struct ObjectiveView {
    satisfied: Option<bool>,
    measure: Option<f64>,
}

/// Stateless rule evaluator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// First firing pre-condition rule's action.
    pub fn evaluate_pre_condition_rules(&self, activity: &Activity) -> Option<PreConditionAction> {
        self.first_match(
            activity,
            &activity.sequencing_rules.pre_condition,
            RuleType::PreCondition,
        )
        .map(|m| m.action)
    }

    /// First firing post-condition rule's action.
    pub fn evaluate_post_condition_rules(&self, activity: &Activity) -> Option<PostConditionAction> {
        self.first_match(
            activity,
            &activity.sequencing_rules.post_condition,
            RuleType::PostCondition,
        )
        .map(|m| m.action)
    }

    /// First firing exit-condition rule's action.
    pub fn evaluate_exit_condition_rules(&self, activity: &Activity) -> Option<ExitConditionAction> {
        self.first_match(
            activity,
            &activity.sequencing_rules.exit_condition,
            RuleType::ExitCondition,
        )
        .map(|m| m.action)
    }

    /// Evaluate `rules` in declaration order and stop at the first that fires.
    ///
    /// A rule whose clauses cannot be evaluated is logged and passed over.
    pub fn first_match<A: Copy + fmt::Debug>(
        &self,
        activity: &Activity,
        rules: &[SequencingRule<A>],
        rule_type: RuleType,
    ) -> Option<RuleMatch<A>> {
        for (rule_index, rule) in rules.iter().enumerate() {
            match self.evaluate_rule(activity, rule) {
                Ok(true) => {
                    debug!(
                        activity_id = %activity.id,
                        %rule_type,
                        rule_index,
                        action = ?rule.action,
                        "sequencing rule matched"
                    );
                    return Some(RuleMatch {
                        action: rule.action,
                        rule_index,
                    });
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        activity_id = %activity.id,
                        %rule_type,
                        rule_index,
                        category = error.category(),
                        %error,
                        "sequencing rule skipped"
                    );
                }
            }
        }
        None
    }

    /// Whether one rule fires. A rule without clauses never fires.
    pub fn evaluate_rule<A>(
        &self,
        activity: &Activity,
        rule: &SequencingRule<A>,
    ) -> Result<bool, RuleEvaluationError> {
        if rule.conditions.is_empty() {
            return Ok(false);
        }
        let values = rule
            .conditions
            .iter()
            .map(|c| self.evaluate_condition(activity, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(combine(rule.combination, &values) == Some(true))
    }

    /// Evaluate one clause, `negate` applied. `None` means unknown.
    pub fn evaluate_condition(
        &self,
        activity: &Activity,
        condition: &RuleCondition,
    ) -> Result<Option<bool>, RuleEvaluationError> {
        let objective = if condition.kind.reads_objective() {
            Some(objective_view(activity, condition.referenced_objective.as_deref())?)
        } else {
            None
        };
        let measure = || objective.as_ref().and_then(|o| o.measure);

        let value = match condition.kind {
            RuleConditionKind::Satisfied => objective.as_ref().and_then(|o| o.satisfied),
            RuleConditionKind::ObjectiveStatusKnown => {
                Some(objective.as_ref().is_some_and(|o| o.satisfied.is_some()))
            }
            RuleConditionKind::ObjectiveMeasureKnown => Some(measure().is_some()),
            RuleConditionKind::ObjectiveMeasureGreaterThan { threshold } => {
                measure().map(|m| m > threshold)
            }
            RuleConditionKind::ObjectiveMeasureLessThan { threshold } => {
                measure().map(|m| m < threshold)
            }
            RuleConditionKind::Completed => match activity.state.completion_status {
                sn_tree::CompletionStatus::Unknown => None,
                status => Some(status == sn_tree::CompletionStatus::Completed),
            },
            RuleConditionKind::ActivityProgressKnown => {
                Some(activity.state.completion_status.is_known())
            }
            RuleConditionKind::Attempted => Some(activity.is_attempted()),
            RuleConditionKind::AttemptLimitExceeded => Some(activity.attempt_limit_exceeded()),
            RuleConditionKind::TimeLimitExceeded => Some(activity.time_limit_exceeded()),
            RuleConditionKind::Always => Some(true),
        };

        Ok(if condition.negate { value.map(|v| !v) } else { value })
    }
}

fn objective_view(
    activity: &Activity,
    referenced: Option<&str>,
) -> Result<ObjectiveView, RuleEvaluationError> {
    match referenced {
        None => Ok(primary_view(activity)),
        Some(id) if activity.is_primary_objective(id) => Ok(primary_view(activity)),
        Some(id) => activity
            .objective(id)
            .map(|o| ObjectiveView {
                satisfied: o.state.satisfied,
                measure: o.state.measure,
            })
            .ok_or_else(|| RuleEvaluationError::UnknownObjective {
                activity_id: activity.id.clone(),
                objective_id: id.to_string(),
            }),
    }
}

fn primary_view(activity: &Activity) -> ObjectiveView {
    ObjectiveView {
        satisfied: activity.objective_satisfied(),
        measure: activity.state.objective_measure,
    }
}

/// Three-valued AND/OR.
fn combine(combination: ConditionCombination, values: &[Option<bool>]) -> Option<bool> {
    match combination {
        ConditionCombination::All => {
            if values.contains(&Some(false)) {
                Some(false)
            } else if values.contains(&None) {
                None
            } else {
                Some(true)
            }
        }
        ConditionCombination::Any => {
            if values.contains(&Some(true)) {
                Some(true)
            } else if values.contains(&None) {
                None
            } else {
                Some(false)
            }
        }
    }
}
