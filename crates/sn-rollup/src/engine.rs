//! Rollup engine.

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;
use sn_tree::{Activity, ActivityIdx, ActivityTree, CompletionStatus, SuccessStatus};
use tracing::debug;

use crate::{measure, status};

/// Rollup behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollupOptions {
    /// Stop at the first ancestor whose status is unchanged.
    pub stop_when_unchanged: bool,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            stop_when_unchanged: true,
        }
    }
}

/// What one rollup pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupReport {
    /// Ancestors whose state changed, nearest first.
    pub updated: Vec<ActivityId>,
    /// Ancestors recomputed.
    pub levels_visited: usize,
}

/// The part of an activity's state rollup writes.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Snapshot {
    completion: CompletionStatus,
    success: SuccessStatus,
    objective_measure: Option<f64>,
    progress_measure: Option<f64>,
}

impl Snapshot {
    fn of(activity: &Activity) -> Self {
        Self {
            completion: activity.state.completion_status,
            success: activity.state.success_status,
            objective_measure: activity.state.objective_measure,
            progress_measure: activity.state.progress_measure,
        }
    }
}

/// Recomputes cluster state from children.
#[derive(Clone, Copy, Debug, Default)]
pub struct RollupEngine {
    options: RollupOptions,
}

impl RollupEngine {
    /// Create an engine.
    pub fn new(options: RollupOptions) -> Self {
        Self { options }
    }

    /// Roll up from the parent of `changed` toward the root.
    pub fn rollup(&self, tree: &mut ActivityTree, changed: ActivityIdx) -> RollupReport {
        let mut report = RollupReport::default();
        let mut cursor = tree.parent(changed);
        while let Some(idx) = cursor {
            report.levels_visited += 1;
            if self.rollup_activity(tree, idx) {
                report.updated.push(tree.id(idx).clone());
            } else if self.options.stop_when_unchanged {
                debug!(
                    changed = %tree.id(changed),
                    stopped_at = %tree.id(idx),
                    "rollup stopped, ancestor unchanged"
                );
                break;
            }
            cursor = tree.parent(idx);
        }
        if !report.updated.is_empty() {
            debug!(
                changed = %tree.id(changed),
                updated = ?report.updated,
                levels = report.levels_visited,
                "rollup complete"
            );
        }
        report
    }

    /// Recompute every cluster, deepest first.
    pub fn rollup_all(&self, tree: &mut ActivityTree) -> RollupReport {
        let mut report = RollupReport::default();
        for idx in tree.preorder().into_iter().rev() {
            if tree.is_leaf(idx) {
                continue;
            }
            report.levels_visited += 1;
            if self.rollup_activity(tree, idx) {
                report.updated.push(tree.id(idx).clone());
            }
        }
        report
    }

    /// Recompute one cluster from its direct children.
    ///
    /// Returns whether its state changed. Leaves are left alone.
    pub fn rollup_activity(&self, tree: &mut ActivityTree, idx: ActivityIdx) -> bool {
        if tree.is_leaf(idx) {
            return false;
        }
        let before = Snapshot::of(tree.get(idx));

        let objective_measure = measure::objective_measure(tree, idx);
        let progress_measure = measure::progress_measure(tree, idx);

        let activity = tree.get(idx);
        let completion_eligible: Vec<&Activity> = tree
            .children(idx)
            .iter()
            .map(|&c| tree.get(c))
            .filter(|c| c.rollup_controls.contributes_to_completion())
            .collect();
        let satisfaction_eligible: Vec<&Activity> = tree
            .children(idx)
            .iter()
            .map(|&c| tree.get(c))
            .filter(|c| c.rollup_controls.contributes_to_satisfaction())
            .collect();
        let completion = status::completion(&activity.rollup_policy, &completion_eligible);
        let satisfaction = status::satisfaction(&activity.rollup_policy, &satisfaction_eligible);

        let activity = tree.get_mut(idx);
        activity.state.objective_measure = objective_measure;
        activity.state.progress_measure = progress_measure;
        if let Some(completion) = completion {
            activity.state.completion_status = completion;
        }
        if let Some(satisfaction) = satisfaction {
            activity.state.success_status = satisfaction;
        }
        let _ = activity.evaluate_satisfied_by_measure();

        let after = Snapshot::of(activity);
        if after != before {
            debug!(
                activity_id = %activity.id,
                completion = %after.completion,
                success = %after.success,
                "activity rolled up"
            );
        }
        after != before
    }
}
