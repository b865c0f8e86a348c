//! Arena-backed activity tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;

use crate::activity::{Activity, ActivityIdx};

/// Structural summary consumed by navigation UIs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    /// Every activity, root included.
    pub total_activities: usize,
    /// Activities without children.
    pub leaf_activities: usize,
    /// Leaves with a resource.
    pub launchable_activities: usize,
    /// Depth of the deepest activity (root = 0).
    pub max_depth: usize,
}

/// A built activity tree.
///
/// Nodes are stored in pre-order; the root is always the first node. Cloning
/// the tree is how the navigation handler checkpoints state before a request.
#[derive(Clone, Debug)]
pub struct ActivityTree {
    nodes: Vec<Activity>,
    index: HashMap<ActivityId, ActivityIdx>,
}

impl ActivityTree {
    pub(crate) fn from_parts(nodes: Vec<Activity>, index: HashMap<ActivityId, ActivityIdx>) -> Self {
        Self { nodes, index }
    }

    /// The root activity.
    pub fn root(&self) -> ActivityIdx {
        ActivityIdx(0)
    }

    /// Number of activities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a built tree has a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Activity at `idx`.
    pub fn get(&self, idx: ActivityIdx) -> &Activity {
        &self.nodes[idx.0]
    }

    /// Mutable activity at `idx`.
    pub fn get_mut(&mut self, idx: ActivityIdx) -> &mut Activity {
        &mut self.nodes[idx.0]
    }

    /// Identifier of the activity at `idx`.
    pub fn id(&self, idx: ActivityIdx) -> &ActivityId {
        &self.nodes[idx.0].id
    }

    /// Resolve an identifier.
    pub fn find_activity(&self, id: &str) -> Option<ActivityIdx> {
        self.index.get(id).copied()
    }

    /// Look up an activity by identifier.
    pub fn activity_by_id(&self, id: &str) -> Option<&Activity> {
        self.find_activity(id).map(|idx| self.get(idx))
    }

    /// All activities in pre-order with their index.
    pub fn iter(&self) -> impl Iterator<Item = (ActivityIdx, &Activity)> {
        self.nodes.iter().enumerate().map(|(i, a)| (ActivityIdx(i), a))
    }

    /// Parent of `idx`; `None` for the root.
    pub fn parent(&self, idx: ActivityIdx) -> Option<ActivityIdx> {
        self.get(idx).parent
    }

    /// Children of `idx` in manifest order.
    pub fn children(&self, idx: ActivityIdx) -> &[ActivityIdx] {
        &self.get(idx).children
    }

    /// Other children of the same parent, in order. The root has none.
    pub fn siblings(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        self.parent(idx)
            .map(|p| {
                self.children(p)
                    .iter()
                    .copied()
                    .filter(|&c| c != idx)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `idx` has no children.
    pub fn is_leaf(&self, idx: ActivityIdx) -> bool {
        self.get(idx).is_leaf()
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut out = Vec::with_capacity(self.get(idx).depth);
        let mut cursor = self.parent(idx);
        while let Some(p) = cursor {
            out.push(p);
            cursor = self.parent(p);
        }
        out
    }

    /// Root down to `idx`, inclusive.
    pub fn path_from_root(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut path = self.ancestors(idx);
        path.reverse();
        path.push(idx);
        path
    }

    /// Deepest activity that is `a` or an ancestor of `a`, and likewise for `b`.
    pub fn common_ancestor(&self, a: ActivityIdx, b: ActivityIdx) -> ActivityIdx {
        let (mut a, mut b) = (a, b);
        while self.get(a).depth > self.get(b).depth {
            a = self.parent(a).unwrap_or(a);
        }
        while self.get(b).depth > self.get(a).depth {
            b = self.parent(b).unwrap_or(b);
        }
        while a != b {
            match (self.parent(a), self.parent(b)) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                _ => return self.root(),
            }
        }
        a
    }

    /// Depth-first, left-to-right pre-order walk from the root.
    pub fn preorder(&self) -> Vec<ActivityIdx> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children(idx).iter().rev());
        }
        order
    }

    /// Every descendant of `idx`, excluding itself.
    pub fn descendants(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut out = Vec::new();
        let mut stack: Vec<ActivityIdx> = self.children(idx).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Structural summary of the tree.
    pub fn stats(&self) -> TreeStats {
        self.nodes.iter().fold(TreeStats::default(), |mut stats, a| {
            stats.total_activities += 1;
            if a.is_leaf() {
                stats.leaf_activities += 1;
            }
            if a.is_launchable() {
                stats.launchable_activities += 1;
            }
            stats.max_depth = stats.max_depth.max(a.depth);
            stats
        })
    }
}
