//! Session lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a sequencing session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// No activity delivered yet.
    #[default]
    NotStarted,
    /// An activity is current.
    Active,
    /// `suspendAll` was processed; waiting for `resumeAll`.
    Suspended,
    /// The session ended; every request is denied.
    Terminated,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "notStarted"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}
