//! # sn-tree
//!
//! The activity tree of a course and everything stored on its nodes.
//!
//! - [`spec`]: serde input describing a course structure, including shared
//!   definitions referenced by identifier
//! - [`builder`]: [`TreeBuilder`] turns a spec into an [`ActivityTree`] behind
//!   cycle, depth, size and reference guards, resolving control-mode
//!   inheritance once
//! - [`tree`]: arena storage and structural queries
//! - [`activity`]: per-node configuration and tracked state
//! - [`rules`] / [`rollup`]: sequencing and rollup rule definitions
//! - [`tracking`]: the narrow adapter to the run-time environment

#![deny(unsafe_code)]

pub mod activity;
pub mod builder;
pub mod rollup;
pub mod rules;
pub mod spec;
pub mod tracking;
pub mod tree;

pub use activity::{
    Activity, ActivityIdx, CompletionStatus, ControlMode, LimitConditions, Objective,
    ObjectiveState, PrimaryObjective, SuccessStatus, TrackedState,
};
pub use builder::{BuildOptions, TreeBuilder};
pub use rollup::{
    ChildActivitySet, RollupAction, RollupCondition, RollupConditionKind, RollupControls,
    RollupPolicy, RollupRule,
};
pub use rules::{
    ConditionCombination, ExitConditionAction, PostConditionAction, PreConditionAction,
    RuleCondition, RuleConditionKind, SequencingRule, SequencingRules,
};
pub use spec::{ActivitySpec, ActivityTreeSpec, ChildSpec, ControlModeSpec};
pub use tracking::{
    InMemoryTracking, SYNCED_FIELDS, TrackedField, TrackedValue, TrackingAdapter,
};
pub use tree::{ActivityTree, TreeStats};
