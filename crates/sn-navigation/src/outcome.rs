//! Results of processing a navigation request.

use std::fmt;

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;

use crate::request::NavigationRequestKind;
use crate::status::SessionStatus;

/// What a navigation request did.
///
/// A denial is an expected result, not an error: the tree and session are
/// left exactly as they were before the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NavigationOutcome {
    /// An activity was delivered and is now current.
    Delivered {
        /// The delivered leaf.
        #[serde(rename = "activityId")]
        activity_id: ActivityId,
    },
    /// The current attempt ended; the activity stays current but inactive.
    Exited {
        /// The exited activity.
        #[serde(rename = "activityId")]
        activity_id: ActivityId,
    },
    /// The session was suspended at an activity.
    Suspended {
        /// The suspended activity.
        #[serde(rename = "activityId")]
        activity_id: ActivityId,
    },
    /// The session ended.
    Terminated,
    /// The request is not allowed.
    Denied {
        /// Why it was denied.
        reason: DenialReason,
    },
}

impl NavigationOutcome {
    /// The denial reason, if denied.
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Self::Denied { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<DenialReason> for NavigationOutcome {
    fn from(reason: DenialReason) -> Self {
        Self::Denied { reason }
    }
}

/// Why a navigation request was not allowed.
///
/// JSON: `{"code": "flow_disabled", "detail": "module-1"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum DenialReason {
    /// The request type is not valid in the session's status.
    InvalidRequestForState {
        /// The request type.
        request: NavigationRequestKind,
        /// The session status it arrived in.
        status: SessionStatus,
    },
    /// The session has ended.
    SessionTerminated,
    /// The request needs a current activity and there is none.
    NoCurrentActivity,
    /// Flow navigation is disabled in this cluster.
    FlowDisabled(ActivityId),
    /// Backward movement is forbidden in this cluster.
    ForwardOnly(ActivityId),
    /// Traversal found no activity to deliver.
    NoAvailableActivity,
    /// Forward traversal is stopped at this activity.
    StopForwardTraversal(ActivityId),
    /// Choice is disabled in this cluster.
    ChoiceDisabled(ActivityId),
    /// This active cluster may not be left by choice.
    ChoiceExitDisabled(ActivityId),
    /// The target is not visible.
    TargetHidden(ActivityId),
    /// A rule hides this activity from choice.
    TargetHiddenFromChoice(ActivityId),
    /// A rule disables this activity.
    TargetDisabled(ActivityId),
    /// The activity has used up its attempts.
    AttemptLimitExceeded(ActivityId),
    /// `resumeAll` without a suspended activity.
    NothingSuspended,
}

impl DenialReason {
    /// Stable snake-case code for logging and the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequestForState { .. } => "invalid_request_for_state",
            Self::SessionTerminated => "session_terminated",
            Self::NoCurrentActivity => "no_current_activity",
            Self::FlowDisabled(_) => "flow_disabled",
            Self::ForwardOnly(_) => "forward_only",
            Self::NoAvailableActivity => "no_available_activity",
            Self::StopForwardTraversal(_) => "stop_forward_traversal",
            Self::ChoiceDisabled(_) => "choice_disabled",
            Self::ChoiceExitDisabled(_) => "choice_exit_disabled",
            Self::TargetHidden(_) => "target_hidden",
            Self::TargetHiddenFromChoice(_) => "target_hidden_from_choice",
            Self::TargetDisabled(_) => "target_disabled",
            Self::AttemptLimitExceeded(_) => "attempt_limit_exceeded",
            Self::NothingSuspended => "nothing_suspended",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequestForState { request, status } => {
                write!(f, "{request} is not allowed while the session is {status}")
            }
            Self::SessionTerminated => f.write_str("the session has terminated"),
            Self::NoCurrentActivity => f.write_str("there is no current activity"),
            Self::FlowDisabled(id) => write!(f, "flow navigation is disabled in {id}"),
            Self::ForwardOnly(id) => write!(f, "{id} only allows forward navigation"),
            Self::NoAvailableActivity => f.write_str("no activity is available"),
            Self::StopForwardTraversal(id) => write!(f, "forward traversal stops at {id}"),
            Self::ChoiceDisabled(id) => write!(f, "choice is disabled in {id}"),
            Self::ChoiceExitDisabled(id) => write!(f, "{id} may not be exited by choice"),
            Self::TargetHidden(id) => write!(f, "{id} is not visible"),
            Self::TargetHiddenFromChoice(id) => write!(f, "{id} is hidden from choice"),
            Self::TargetDisabled(id) => write!(f, "{id} is disabled"),
            Self::AttemptLimitExceeded(id) => write!(f, "{id} has no attempts left"),
            Self::NothingSuspended => f.write_str("nothing is suspended"),
        }
    }
}
