//! Navigation requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sn_core::{ActivityId, SequencingError};

/// A navigation request from the learner or the RTE.
///
/// JSON: `{"type": "continue"}`, `{"type": "choice", "targetActivityId": "m2"}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NavigationRequest {
    /// Deliver the first available activity.
    Start,
    /// Return to the suspended activity.
    ResumeAll,
    /// Move forward in flow order.
    Continue,
    /// Move backward in flow order.
    Previous,
    /// Deliver a specific activity.
    Choice {
        /// Activity to deliver (a cluster flows to its first leaf).
        #[serde(rename = "targetActivityId")]
        target_activity_id: ActivityId,
    },
    /// End the current attempt without post-condition rules.
    UnqualifiedExit,
    /// End every attempt and terminate the session.
    ExitAll,
    /// Suspend the session at the current activity.
    SuspendAll,
}

impl NavigationRequest {
    /// A choice request.
    pub fn choice(target: impl Into<ActivityId>) -> Self {
        Self::Choice {
            target_activity_id: target.into(),
        }
    }

    /// Assemble a request from its type and optional target.
    ///
    /// A choice without a target is a caller bug.
    pub fn from_parts(
        kind: NavigationRequestKind,
        target: Option<ActivityId>,
    ) -> Result<Self, SequencingError> {
        Ok(match kind {
            NavigationRequestKind::Start => Self::Start,
            NavigationRequestKind::ResumeAll => Self::ResumeAll,
            NavigationRequestKind::Continue => Self::Continue,
            NavigationRequestKind::Previous => Self::Previous,
            NavigationRequestKind::Choice => Self::Choice {
                target_activity_id: target.ok_or(SequencingError::MissingChoiceTarget)?,
            },
            NavigationRequestKind::UnqualifiedExit => Self::UnqualifiedExit,
            NavigationRequestKind::ExitAll => Self::ExitAll,
            NavigationRequestKind::SuspendAll => Self::SuspendAll,
        })
    }

    /// The request type without its payload.
    pub fn kind(&self) -> NavigationRequestKind {
        match self {
            Self::Start => NavigationRequestKind::Start,
            Self::ResumeAll => NavigationRequestKind::ResumeAll,
            Self::Continue => NavigationRequestKind::Continue,
            Self::Previous => NavigationRequestKind::Previous,
            Self::Choice { .. } => NavigationRequestKind::Choice,
            Self::UnqualifiedExit => NavigationRequestKind::UnqualifiedExit,
            Self::ExitAll => NavigationRequestKind::ExitAll,
            Self::SuspendAll => NavigationRequestKind::SuspendAll,
        }
    }
}

impl fmt::Display for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Choice { target_activity_id } => write!(f, "choice:{target_activity_id}"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// `start`, `continue`, `choice:<id>`, ...
impl FromStr for NavigationRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, target) = match s.split_once(':') {
            Some((kind, target)) => (kind, Some(ActivityId::from(target.trim()))),
            None => (s, None),
        };
        let kind: NavigationRequestKind = kind.trim().parse()?;
        if target.is_some() && kind != NavigationRequestKind::Choice {
            return Err(format!("{kind} does not take a target"));
        }
        Self::from_parts(kind, target).map_err(|e| e.to_string())
    }
}

/// Navigation request types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationRequestKind {
    /// See [`NavigationRequest::Start`].
    Start,
    /// See [`NavigationRequest::ResumeAll`].
    ResumeAll,
    /// See [`NavigationRequest::Continue`].
    Continue,
    /// See [`NavigationRequest::Previous`].
    Previous,
    /// See [`NavigationRequest::Choice`].
    Choice,
    /// See [`NavigationRequest::UnqualifiedExit`].
    UnqualifiedExit,
    /// See [`NavigationRequest::ExitAll`].
    ExitAll,
    /// See [`NavigationRequest::SuspendAll`].
    SuspendAll,
}

impl NavigationRequestKind {
    /// The camelCase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ResumeAll => "resumeAll",
            Self::Continue => "continue",
            Self::Previous => "previous",
            Self::Choice => "choice",
            Self::UnqualifiedExit => "unqualifiedExit",
            Self::ExitAll => "exitAll",
            Self::SuspendAll => "suspendAll",
        }
    }
}

impl fmt::Display for NavigationRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavigationRequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "resumeAll" | "resume" => Ok(Self::ResumeAll),
            "continue" | "next" => Ok(Self::Continue),
            "previous" | "prev" => Ok(Self::Previous),
            "choice" => Ok(Self::Choice),
            "unqualifiedExit" | "exit" => Ok(Self::UnqualifiedExit),
            "exitAll" => Ok(Self::ExitAll),
            "suspendAll" | "suspend" => Ok(Self::SuspendAll),
            other => Err(format!("unknown navigation request: {other}")),
        }
    }
}
