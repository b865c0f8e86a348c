//! # sn-navigation
//!
//! The navigation request state machine of a sequencing session.
//!
//! [`NavigationHandler`] owns one activity tree and processes
//! [`NavigationRequest`]s against it:
//!
//! - **Flow** (`start`, `continue`, `previous`): depth-first, left-to-right
//!   traversal that honors `flow`, `forwardOnly`, visibility, attempt limits
//!   and pre-condition rules ([`traversal`])
//! - **Choice**: direct targeting gated by `choice`, `choiceExit`,
//!   hidden/disabled rules and forward-only clusters ([`choice`])
//! - **Departure**: ending an attempt syncs tracking, rolls up, then applies
//!   exit-condition and post-condition rules
//! - **Lifecycle**: `suspendAll`, `resumeAll`, `unqualifiedExit`, `exitAll`
//!
//! A request that is not allowed yields [`NavigationOutcome::Denied`] with a
//! [`DenialReason`] and leaves every piece of state as it was.

#![deny(unsafe_code)]

pub mod availability;
pub mod choice;
pub mod handler;
pub mod outcome;
pub mod request;
pub mod status;
pub mod traversal;

pub use availability::NavigationAvailability;
pub use handler::{HandlerOptions, NavigationHandler};
pub use outcome::{DenialReason, NavigationOutcome};
pub use request::{NavigationRequest, NavigationRequestKind};
pub use status::SessionStatus;
pub use traversal::{Direction, FlowTraversal, Traversal};
