//! Rule evaluation anomalies.

use sn_core::ActivityId;
use thiserror::Error;

/// A clause that could not be evaluated.
///
/// Never fatal: the evaluator logs it and treats the rule as not applying.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleEvaluationError {
    /// The clause references an objective the activity does not define.
    #[error("activity {activity_id} has no objective {objective_id}")]
    UnknownObjective {
        /// Activity whose rule holds the clause.
        activity_id: ActivityId,
        /// The referenced objective.
        objective_id: String,
    },
}

impl RuleEvaluationError {
    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownObjective { .. } => "unknown_objective",
        }
    }
}
