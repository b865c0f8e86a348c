//! Results of navigation requests at the facade.

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;
use sn_navigation::{DenialReason, NavigationOutcome};

/// Why a request did not take effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResponseReason {
    /// No tree has been loaded.
    NotInitialized,
    /// Another request is being processed.
    Busy,
    /// The session has ended.
    Terminated,
    /// The navigation handler denied the request.
    Denied {
        /// The handler's reason.
        denial: DenialReason,
    },
}

impl ResponseReason {
    /// Stable code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::Busy => "busy",
            Self::Terminated => "terminated",
            Self::Denied { denial } => denial.code(),
        }
    }
}

/// A facade call that either ran or was turned away for `ResponseReason`.
pub type Admitted<T> = Result<T, ResponseReason>;

/// Answer to `process_navigation_request`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    /// Whether the request took effect.
    pub success: bool,
    /// Current activity after the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_activity_id: Option<ActivityId>,
    /// The handler's outcome, when the request reached it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<NavigationOutcome>,
    /// Why the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ResponseReason>,
}

impl NavigationResponse {
    /// A request that never reached the handler.
    pub fn rejected(reason: ResponseReason) -> Self {
        Self {
            success: false,
            current_activity_id: None,
            outcome: None,
            reason: Some(reason),
        }
    }

    /// Wrap a handler outcome.
    pub fn from_outcome(outcome: NavigationOutcome, current_activity_id: Option<ActivityId>) -> Self {
        let reason = outcome.denial().map(|denial| ResponseReason::Denied {
            denial: denial.clone(),
        });
        Self {
            success: reason.is_none(),
            current_activity_id,
            outcome: Some(outcome),
            reason,
        }
    }
}
