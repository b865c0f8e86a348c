//! # sn-rules
//!
//! Evaluation of pre-condition, post-condition and exit-condition rules.
//!
//! Rules are checked in declaration order and the first rule whose combined
//! condition holds decides the action. Evaluation is pure: it reads activity
//! state and never changes it. A clause that cannot be evaluated (it names an
//! objective the activity does not have) makes its rule not apply and is
//! logged.

#![deny(unsafe_code)]

pub mod errors;
pub mod evaluator;

pub use errors::RuleEvaluationError;
pub use evaluator::{RuleEvaluator, RuleMatch, RuleType};
