//! Choice request validation.
//!
//! Checks run in a fixed order and the first failing one decides the denial:
//!
//! 1. the target is visible
//! 2. no activity on the root-to-target path is hidden from choice or disabled
//! 3. every proper ancestor of the target allows `choice`
//! 4. the target has attempts left
//! 5. leaving the current activity is allowed: `choiceExit` on the active
//!    clusters being exited, `forwardOnly` on the common ancestor for a
//!    backward choice, and `stopForwardTraversal` between the two for a
//!    forward one
//! 6. a deliverable leaf exists (a cluster target flows to its first leaf)

use sn_rules::RuleEvaluator;
use sn_tree::{ActivityIdx, ActivityTree, PreConditionAction};

use crate::outcome::DenialReason;
use crate::traversal::{Direction, FlowTraversal};

/// Validate a choice of `target` while `current` is the current activity.
///
/// Returns the leaf that would be delivered. Pure; nothing is mutated.
pub fn check_choice(
    tree: &ActivityTree,
    current: Option<ActivityIdx>,
    target: ActivityIdx,
) -> Result<ActivityIdx, DenialReason> {
    let rules = RuleEvaluator::new();
    let activity = tree.get(target);

    if !activity.is_visible {
        return Err(DenialReason::TargetHidden(activity.id.clone()));
    }

    for idx in tree.path_from_root(target) {
        let node = tree.get(idx);
        match rules.evaluate_pre_condition_rules(node) {
            Some(PreConditionAction::HiddenFromChoice) => {
                return Err(DenialReason::TargetHiddenFromChoice(node.id.clone()));
            }
            Some(PreConditionAction::Disabled) => {
                return Err(DenialReason::TargetDisabled(node.id.clone()));
            }
            _ => {}
        }
    }

    if let Some(blocking) = tree
        .ancestors(target)
        .into_iter()
        .find(|&a| !tree.get(a).control_mode.choice)
    {
        return Err(DenialReason::ChoiceDisabled(tree.id(blocking).clone()));
    }

    if activity.attempt_limit_exceeded() {
        return Err(DenialReason::AttemptLimitExceeded(activity.id.clone()));
    }

    if let Some(current) = current.filter(|&c| c != target) {
        check_leaving(tree, current, target)?;
    }

    if activity.is_leaf() {
        return if activity.is_launchable() {
            Ok(target)
        } else {
            Err(DenialReason::NoAvailableActivity)
        };
    }
    FlowTraversal::new(tree)
        .enter(target, Direction::Forward)
        .into_result()
}

fn check_leaving(
    tree: &ActivityTree,
    current: ActivityIdx,
    target: ActivityIdx,
) -> Result<(), DenialReason> {
    let common = tree.common_ancestor(current, target);

    // Active clusters between the current activity and the common ancestor
    // end when the target is delivered.
    for idx in tree.ancestors(current) {
        if idx == common {
            break;
        }
        let cluster = tree.get(idx);
        if cluster.is_active && !cluster.control_mode.choice_exit {
            return Err(DenialReason::ChoiceExitDisabled(cluster.id.clone()));
        }
    }

    if common == target || common == current {
        return Ok(());
    }

    // Arena order is pre-order, so index order is flow order.
    if target.index() < current.index() {
        let cluster = tree.get(common);
        if cluster.control_mode.forward_only {
            return Err(DenialReason::ForwardOnly(cluster.id.clone()));
        }
        return Ok(());
    }

    let flow = FlowTraversal::new(tree);
    let (Some(from), Some(to)) = (
        child_towards(tree, common, current),
        child_towards(tree, common, target),
    ) else {
        return Ok(());
    };

    let mut cursor = current;
    while cursor != from {
        if flow.stops_forward(cursor) {
            return Err(DenialReason::StopForwardTraversal(tree.id(cursor).clone()));
        }
        match tree.parent(cursor) {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    let siblings = tree.children(common);
    let start = siblings.iter().position(|&c| c == from).unwrap_or(0);
    let end = siblings.iter().position(|&c| c == to).unwrap_or(start);
    for &idx in &siblings[start..end] {
        if flow.stops_forward(idx) {
            return Err(DenialReason::StopForwardTraversal(tree.id(idx).clone()));
        }
    }
    Ok(())
}

/// The child of `ancestor` on the path down to `idx`.
fn child_towards(tree: &ActivityTree, ancestor: ActivityIdx, idx: ActivityIdx) -> Option<ActivityIdx> {
    let mut cursor = idx;
    while let Some(parent) = tree.parent(cursor) {
        if parent == ancestor {
            return Some(cursor);
        }
        cursor = parent;
    }
    None
}
