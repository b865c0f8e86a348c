//! Flow traversal: depth-first, pre-order, left-to-right.
//!
//! Traversal is pure. It reads the tree and pre-condition rules and returns
//! the leaf a flow request would deliver, without touching any state.

use sn_rules::RuleEvaluator;
use sn_tree::{ActivityIdx, ActivityTree, PreConditionAction};

use crate::outcome::DenialReason;

/// Direction of a flow request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// `continue`.
    Forward,
    /// `previous`.
    Backward,
}

/// Result of a traversal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// A deliverable leaf.
    Found(ActivityIdx),
    /// Ran off the end of the tree without a candidate.
    Exhausted,
    /// A control mode or rule stopped the traversal.
    Blocked(DenialReason),
}

impl Traversal {
    /// The found leaf, or the reason nothing was found.
    pub fn into_result(self) -> Result<ActivityIdx, DenialReason> {
        match self {
            Self::Found(idx) => Ok(idx),
            Self::Exhausted => Err(DenialReason::NoAvailableActivity),
            Self::Blocked(reason) => Err(reason),
        }
    }
}

/// Walks an activity tree in flow order.
pub struct FlowTraversal<'a> {
    tree: &'a ActivityTree,
    rules: RuleEvaluator,
}

impl<'a> FlowTraversal<'a> {
    /// Traverse `tree`.
    pub fn new(tree: &'a ActivityTree) -> Self {
        Self {
            tree,
            rules: RuleEvaluator::new(),
        }
    }

    /// The leaf a `start` request delivers.
    pub fn first_from_root(&self) -> Traversal {
        self.descend(self.tree.root(), Direction::Forward)
    }

    /// Whether flow passes over `idx` and its whole subtree.
    pub fn is_passed_over(&self, idx: ActivityIdx) -> bool {
        let activity = self.tree.get(idx);
        if activity.attempt_limit_exceeded() {
            return true;
        }
        matches!(
            self.rules.evaluate_pre_condition_rules(activity),
            Some(
                PreConditionAction::Skip
                    | PreConditionAction::Disabled
                    | PreConditionAction::HiddenFromChoice
            )
        )
    }

    /// Whether forward traversal may not move past `idx`.
    pub fn stops_forward(&self, idx: ActivityIdx) -> bool {
        self.rules.evaluate_pre_condition_rules(self.tree.get(idx))
            == Some(PreConditionAction::StopForwardTraversal)
    }

    /// Enter `idx` and find the first candidate leaf in `direction`.
    ///
    /// Invisible clusters are still entered; only leaves need to be visible.
    /// Entering a forward-only cluster backward starts at its first child.
    pub fn descend(&self, idx: ActivityIdx, direction: Direction) -> Traversal {
        if self.is_passed_over(idx) {
            return Traversal::Exhausted;
        }
        self.enter(idx, direction)
    }

    /// Like [`descend`](Self::descend), without the pre-condition and
    /// attempt-limit check on `idx` itself.
    pub fn enter(&self, idx: ActivityIdx, direction: Direction) -> Traversal {
        let activity = self.tree.get(idx);
        if activity.is_leaf() {
            return if activity.is_visible && activity.is_launchable() {
                Traversal::Found(idx)
            } else {
                Traversal::Exhausted
            };
        }
        if !activity.control_mode.flow {
            return Traversal::Blocked(DenialReason::FlowDisabled(activity.id.clone()));
        }
        let direction = if activity.control_mode.forward_only {
            Direction::Forward
        } else {
            direction
        };
        self.scan(self.tree.children(idx), direction)
    }

    /// The next candidate after (or before) `idx` in flow order.
    pub fn next_from(&self, idx: ActivityIdx, direction: Direction) -> Traversal {
        let mut cursor = idx;
        loop {
            if direction == Direction::Forward && self.stops_forward(cursor) {
                return Traversal::Blocked(DenialReason::StopForwardTraversal(
                    self.tree.id(cursor).clone(),
                ));
            }
            let Some(parent) = self.tree.parent(cursor) else {
                return Traversal::Exhausted;
            };
            let cluster = self.tree.get(parent);
            if !cluster.control_mode.flow {
                return Traversal::Blocked(DenialReason::FlowDisabled(cluster.id.clone()));
            }
            if direction == Direction::Backward && cluster.control_mode.forward_only {
                return Traversal::Blocked(DenialReason::ForwardOnly(cluster.id.clone()));
            }

            let siblings = self.tree.children(parent);
            let Some(pos) = siblings.iter().position(|&c| c == cursor) else {
                return Traversal::Exhausted;
            };
            let found = match direction {
                Direction::Forward => self.scan(&siblings[pos + 1..], direction),
                Direction::Backward => self.scan(&siblings[..pos], direction),
            };
            if found != Traversal::Exhausted {
                return found;
            }
            cursor = parent;
        }
    }

    fn scan(&self, candidates: &[ActivityIdx], direction: Direction) -> Traversal {
        let ordered: Box<dyn Iterator<Item = &ActivityIdx>> = match direction {
            Direction::Forward => Box::new(candidates.iter()),
            Direction::Backward => Box::new(candidates.iter().rev()),
        };
        for &child in ordered {
            match self.descend(child, direction) {
                Traversal::Exhausted => {}
                other => return other,
            }
        }
        Traversal::Exhausted
    }
}
