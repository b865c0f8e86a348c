//! Completion and satisfaction rollup for one cluster.

use sn_tree::{
    Activity, ChildActivitySet, CompletionStatus, ConditionCombination, RollupAction,
    RollupConditionKind, RollupPolicy, RollupRule, SuccessStatus,
};

/// Whether `rule` fires over the eligible children.
pub(crate) fn rule_fires(rule: &RollupRule, eligible: &[&Activity]) -> bool {
    if rule.conditions.is_empty() {
        return false;
    }
    let matching = eligible
        .iter()
        .filter(|child| child_matches(rule, child))
        .count();
    rule.child_activity_set.holds(matching, eligible.len())
}

fn child_matches(rule: &RollupRule, child: &Activity) -> bool {
    let mut results = rule
        .conditions
        .iter()
        .map(|c| condition_holds(c.condition, child) != c.negate);
    match rule.condition_combination {
        ConditionCombination::All => results.all(|r| r),
        ConditionCombination::Any => results.any(|r| r),
    }
}

fn condition_holds(kind: RollupConditionKind, child: &Activity) -> bool {
    match kind {
        RollupConditionKind::Satisfied => child.objective_satisfied() == Some(true),
        RollupConditionKind::ObjectiveStatusKnown => child.objective_satisfied().is_some(),
        RollupConditionKind::ObjectiveMeasureKnown => child.state.objective_measure.is_some(),
        RollupConditionKind::Completed => {
            child.state.completion_status == CompletionStatus::Completed
        }
        RollupConditionKind::ActivityProgressKnown => child.state.completion_status.is_known(),
        RollupConditionKind::Attempted => child.is_attempted(),
        RollupConditionKind::AttemptLimitExceeded => child.attempt_limit_exceeded(),
        RollupConditionKind::Always => true,
    }
}

/// Completion of a cluster. `None` leaves the current status alone.
pub(crate) fn completion(policy: &RollupPolicy, eligible: &[&Activity]) -> Option<CompletionStatus> {
    if eligible.is_empty() {
        return Some(CompletionStatus::Unknown);
    }

    let mut rules = policy.completion_rules().peekable();
    if rules.peek().is_some() {
        let (completed, incomplete): (Vec<_>, Vec<_>) =
            rules.partition(|r| r.action == RollupAction::Completed);
        let status = if completed.iter().any(|r| rule_fires(r, eligible)) {
            CompletionStatus::Completed
        } else if incomplete.iter().any(|r| rule_fires(r, eligible)) {
            CompletionStatus::Incomplete
        } else {
            CompletionStatus::Unknown
        };
        return Some(status);
    }

    if policy.consideration == ChildActivitySet::None {
        return None;
    }
    let completed = eligible
        .iter()
        .filter(|c| c.state.completion_status == CompletionStatus::Completed)
        .count();
    let status = if policy.consideration.holds(completed, eligible.len()) {
        CompletionStatus::Completed
    } else if eligible
        .iter()
        .any(|c| c.is_attempted() || c.state.completion_status.is_known())
    {
        CompletionStatus::Incomplete
    } else {
        CompletionStatus::Unknown
    };
    Some(status)
}

/// Satisfaction of a cluster from its children. `None` leaves the current
/// status alone.
pub(crate) fn satisfaction(policy: &RollupPolicy, eligible: &[&Activity]) -> Option<SuccessStatus> {
    if eligible.is_empty() {
        return Some(SuccessStatus::Unknown);
    }

    let mut rules = policy.satisfaction_rules().peekable();
    if rules.peek().is_some() {
        let (satisfied, not_satisfied): (Vec<_>, Vec<_>) =
            rules.partition(|r| r.action == RollupAction::Satisfied);
        let status = if satisfied.iter().any(|r| rule_fires(r, eligible)) {
            SuccessStatus::Passed
        } else if not_satisfied.iter().any(|r| rule_fires(r, eligible)) {
            SuccessStatus::Failed
        } else {
            SuccessStatus::Unknown
        };
        return Some(status);
    }

    if policy.consideration == ChildActivitySet::None {
        return None;
    }
    let satisfied = eligible
        .iter()
        .filter(|c| c.objective_satisfied() == Some(true))
        .count();
    let status = if policy.consideration.holds(satisfied, eligible.len()) {
        SuccessStatus::Passed
    } else if eligible.iter().all(|c| c.objective_satisfied().is_some()) {
        SuccessStatus::Failed
    } else {
        SuccessStatus::Unknown
    };
    Some(status)
}
