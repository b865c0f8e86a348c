//! # sn-rollup
//!
//! Aggregates child status into parent status, bottom-up.
//!
//! [`RollupEngine::rollup`] starts at the parent of the activity whose state
//! changed and walks toward the root. Each ancestor is recomputed from its
//! direct children only, in three steps: measures, completion, satisfaction.
//! The walk stops at the first ancestor whose status did not change unless
//! [`RollupOptions::stop_when_unchanged`] is off. The changed activity itself
//! is never written.

#![deny(unsafe_code)]

pub mod engine;
mod measure;
mod status;

pub use engine::{RollupEngine, RollupOptions, RollupReport};
