//! # sn-session
//!
//! The facade external collaborators (RTE, navigation UI, persistence) talk
//! to. A [`SequencingSession`] owns one activity tree for one loaded course:
//!
//! - **Lifecycle**: `initialize` builds the tree, `terminate` ends the session
//! - **Requests**: `process_navigation_request`, `update_tracking` and
//!   `rollup` delegate to the navigation handler; a call that arrives while
//!   another is in flight is answered `busy`
//! - **State**: `get_sequencing_state` returns the last published snapshot
//!   without blocking
//!
//! An uninitialized session is a normal state. Single-SCO courses may never
//! initialize one, so every call answers `notInitialized` instead of failing.

#![deny(unsafe_code)]

pub mod response;
pub mod session;
pub mod state;

pub use response::{Admitted, NavigationResponse, ResponseReason};
pub use session::SequencingSession;
pub use state::{ActivitySnapshot, LifecycleStatus, SequencingState};
