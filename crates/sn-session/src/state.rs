//! Published sequencing state.
//!
//! A navigation UI and the persistence layer read this snapshot; neither ever
//! touches the tree directly.

use serde::{Deserialize, Serialize};
use sn_core::{ActivityId, SessionId};
use sn_navigation::{NavigationAvailability, NavigationHandler, SessionStatus};
use sn_tree::{Activity, ActivityTree, ControlMode, TrackedState, TreeStats};

/// Lifecycle status as seen through the facade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleStatus {
    /// No tree loaded.
    #[default]
    Uninitialized,
    /// Loaded, nothing delivered yet.
    NotStarted,
    /// An activity is current.
    Active,
    /// Waiting for `resumeAll`.
    Suspended,
    /// Ended.
    Terminated,
}

impl From<SessionStatus> for LifecycleStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::NotStarted => Self::NotStarted,
            SessionStatus::Active => Self::Active,
            SessionStatus::Suspended => Self::Suspended,
            SessionStatus::Terminated => Self::Terminated,
        }
    }
}

/// Per-activity view of the tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    /// Identifier.
    pub id: ActivityId,
    /// Display title.
    pub title: String,
    /// Parent identifier, `None` for the root.
    pub parent_id: Option<ActivityId>,
    /// Depth below the root.
    pub depth: usize,
    /// Whether the activity is a leaf.
    pub is_leaf: bool,
    /// Visibility flag.
    pub is_visible: bool,
    /// An attempt is open.
    pub is_active: bool,
    /// Part of the suspended path.
    pub is_suspended: bool,
    /// Tracked state, flattened into the same JSON object.
    #[serde(flatten)]
    pub state: TrackedState,
}

impl ActivitySnapshot {
    fn of(tree: &ActivityTree, activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            title: activity.title.clone(),
            parent_id: activity.parent.map(|p| tree.id(p).clone()),
            depth: activity.depth,
            is_leaf: activity.is_leaf(),
            is_visible: activity.is_visible,
            is_active: activity.is_active,
            is_suspended: activity.is_suspended,
            state: activity.state.clone(),
        }
    }
}

/// What `get_sequencing_state` returns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencingState {
    /// The session.
    pub session_id: SessionId,
    /// Lifecycle status.
    pub status: LifecycleStatus,
    /// Current activity.
    pub current_activity_id: Option<ActivityId>,
    /// Activity `resumeAll` returns to.
    pub suspended_activity_id: Option<ActivityId>,
    /// The root's first attempt has begun.
    pub root_has_begun: bool,
    /// A navigation request is being processed right now.
    pub sequencing_request_pending: bool,
    /// Tree summary, once a tree is loaded.
    pub activity_tree_stats: Option<TreeStats>,
    /// Effective control modes of the cluster governing the current activity.
    pub control_mode_flags: Option<ControlMode>,
    /// Requests a UI should offer.
    pub availability: NavigationAvailability,
    /// Every activity in flow order.
    pub activities: Vec<ActivitySnapshot>,
}

impl SequencingState {
    /// State of a session with no tree.
    pub fn uninitialized(session_id: SessionId) -> Self {
        Self {
            session_id,
            status: LifecycleStatus::Uninitialized,
            current_activity_id: None,
            suspended_activity_id: None,
            root_has_begun: false,
            sequencing_request_pending: false,
            activity_tree_stats: None,
            control_mode_flags: None,
            availability: NavigationAvailability::default(),
            activities: Vec::new(),
        }
    }

    /// Capture the handler's state.
    pub fn capture(session_id: SessionId, handler: &NavigationHandler) -> Self {
        let tree = handler.tree();
        Self {
            session_id,
            status: handler.status().into(),
            current_activity_id: handler.current_id().cloned(),
            suspended_activity_id: handler.suspended_id().cloned(),
            root_has_begun: handler.root_has_begun(),
            sequencing_request_pending: false,
            activity_tree_stats: Some(tree.stats()),
            control_mode_flags: Some(handler.governing_control_mode()),
            availability: handler.availability(),
            activities: tree
                .iter()
                .map(|(_, activity)| ActivitySnapshot::of(tree, activity))
                .collect(),
        }
    }

    /// Look up one activity's snapshot.
    pub fn activity(&self, id: &str) -> Option<&ActivitySnapshot> {
        self.activities.iter().find(|a| a.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_navigation::{HandlerOptions, NavigationRequest};
    use sn_tree::{ActivitySpec, TreeBuilder};

    fn handler() -> NavigationHandler {
        let tree = TreeBuilder::default()
            .build_root(ActivitySpec::cluster(
                "course",
                [ActivitySpec::leaf("intro"), ActivitySpec::leaf("quiz")],
            ))
            .unwrap();
        NavigationHandler::new(tree, HandlerOptions::default())
    }

    #[test]
    fn uninitialized_state_is_empty() {
        let state = SequencingState::uninitialized(SessionId::new());
        assert_eq!(state.status, LifecycleStatus::Uninitialized);
        assert!(state.activity_tree_stats.is_none());
        assert!(state.activities.is_empty());
        assert!(state.availability.is_empty());
    }

    #[test]
    fn capture_after_start() {
        let mut h = handler();
        let _ = h.process(&NavigationRequest::Start).unwrap();
        let state = SequencingState::capture(SessionId::from("s-1"), &h);
        assert_eq!(state.status, LifecycleStatus::Active);
        assert_eq!(state.current_activity_id, Some("intro".into()));
        assert!(state.root_has_begun);
        assert_eq!(state.activities.len(), 3);
        let intro = state.activity("intro").unwrap();
        assert_eq!(intro.parent_id, Some("course".into()));
        assert_eq!(intro.state.attempt_count, 1);
        let json = serde_json::to_value(intro).unwrap();
        assert_eq!(json["attemptCount"], 1);
        assert_eq!(json["completionStatus"], "unknown");
        assert!(state.availability.continue_);
    }

    #[test]
    fn state_json_snapshot() {
        let h = handler();
        let state = SequencingState::capture(SessionId::from("s-1"), &h);
        let json = serde_json::to_value(&state).unwrap();
        insta::assert_json_snapshot!(json["activityTreeStats"], @r#"
        {
          "launchableActivities": 2,
          "leafActivities": 2,
          "maxDepth": 1,
          "totalActivities": 3
        }
        "#);
        assert_eq!(json["status"], "notStarted");
        assert_eq!(json["controlModeFlags"]["flow"], true);
    }
}
