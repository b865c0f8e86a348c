//! # sn-core
//!
//! Foundation types shared by every crate of the sequencing engine:
//!
//! - **Branded IDs**: [`ActivityId`] (manifest identifiers) and [`SessionId`]
//!   (one per sequencing session) as newtypes for type safety
//! - **Errors**: [`SnError`] hierarchy via `thiserror`, split into structural
//!   tree errors and in-session programming errors
//! - **Logging**: `tracing` subscriber setup and in-memory log capture for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;

pub use errors::{Result, SequencingError, SnError, TreeError};
pub use ids::{ActivityId, SessionId};
