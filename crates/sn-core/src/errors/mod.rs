//! Error hierarchy for the sequencing engine.
//!
//! Provides a structured error type system built on [`thiserror`]:
//!
//! - [`SnError`]: Top-level enum returned by the session facade
//! - [`TreeError`]: Structural problems in the course structure, fatal at
//!   initialize time
//! - [`SequencingError`]: Programming errors raised while a session is running
//!   (unknown activity reference, double initialize)
//!
//! Navigation-not-allowed outcomes are deliberately absent: they are expected
//! results, returned as values by the navigation handler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ActivityId;

/// Result type for fallible engine operations.
pub type Result<T> = std::result::Result<T, SnError>;

// ─────────────────────────────────────────────────────────────────────────────
// SnError: top-level error enum
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the sequencing engine.
#[derive(Debug, Error)]
pub enum SnError {
    /// The activity tree could not be constructed.
    #[error("{0}")]
    Tree(#[from] TreeError),

    /// A programming error inside a running session.
    #[error("{0}")]
    Sequencing(#[from] SequencingError),
}

impl SnError {
    /// Whether this error came from tree construction.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Tree(_))
    }

    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Tree(e) => e.category(),
            Self::Sequencing(e) => e.category(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TreeError
// ─────────────────────────────────────────────────────────────────────────────

/// Structural errors detected while building the activity tree.
///
/// These are defensive guards against malformed input; a validated manifest
/// never produces them.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeError {
    /// The tree is deeper than the configured maximum.
    #[error("activity {activity_id} at depth {depth} exceeds the maximum tree depth {max_depth}")]
    DepthExceeded {
        /// The activity found beyond the limit.
        activity_id: ActivityId,
        /// Its depth (root = 0).
        depth: usize,
        /// Configured maximum depth.
        max_depth: usize,
    },

    /// A child reference points back at an activity on the current path.
    #[error("cycle detected: {activity_id} is referenced by its own descendant {parent_id}")]
    Cycle {
        /// The activity that would become its own ancestor.
        activity_id: ActivityId,
        /// The descendant holding the back-edge.
        parent_id: ActivityId,
    },

    /// The same identifier appears twice in the tree.
    #[error("duplicate activity identifier: {activity_id}")]
    DuplicateIdentifier {
        /// The repeated identifier.
        activity_id: ActivityId,
    },

    /// A child reference names an activity that is not defined.
    #[error("activity {parent_id} references unknown activity {activity_id}")]
    DanglingReference {
        /// The activity holding the reference.
        parent_id: ActivityId,
        /// The identifier that could not be resolved.
        activity_id: ActivityId,
    },

    /// The tree holds more activities than the configured maximum.
    #[error("activity tree exceeds the maximum of {max_activities} activities")]
    TooManyActivities {
        /// Configured maximum.
        max_activities: usize,
    },

    /// An activity carries out-of-range or contradictory configuration.
    #[error("invalid activity {activity_id}: {message}")]
    InvalidActivity {
        /// The offending activity.
        activity_id: ActivityId,
        /// What is wrong with it.
        message: String,
    },
}

impl TreeError {
    /// Create an [`TreeError::InvalidActivity`] error.
    #[must_use]
    pub fn invalid(activity_id: &ActivityId, message: impl Into<String>) -> Self {
        Self::InvalidActivity {
            activity_id: activity_id.clone(),
            message: message.into(),
        }
    }

    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::Cycle { .. } => "cycle",
            Self::DuplicateIdentifier { .. } => "duplicate_identifier",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::TooManyActivities { .. } => "too_many_activities",
            Self::InvalidActivity { .. } => "invalid_activity",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SequencingError
// ─────────────────────────────────────────────────────────────────────────────

/// Programming errors raised while a session is running.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SequencingError {
    /// A request or tracking update named an activity not in the tree.
    #[error("activity not found: {0}")]
    ActivityNotFound(ActivityId),

    /// A choice request arrived without a target.
    #[error("choice request is missing a target activity")]
    MissingChoiceTarget,

    /// `initialize` was called on a session that already holds a tree.
    #[error("sequencing session already initialized")]
    AlreadyInitialized,
}

impl SequencingError {
    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ActivityNotFound(_) => "activity_not_found",
            Self::MissingChoiceTarget => "missing_choice_target",
            Self::AlreadyInitialized => "already_initialized",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
