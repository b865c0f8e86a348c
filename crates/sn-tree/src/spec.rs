//! Course structure input.
//!
//! An [`ActivityTreeSpec`] is what the manifest layer hands over: an ordered
//! hierarchy of [`ActivitySpec`]s. A child entry is either an inline
//! definition or the identifier of an entry in `shared`, which is how a
//! structure can express shared nodes (and, when malformed, cycles or dangling
//! references).
//!
//! ```json
//! {
//!   "root": {
//!     "identifier": "course",
//!     "children": [
//!       { "identifier": "intro", "resourceRef": "intro.html" },
//!       "quiz"
//!     ]
//!   },
//!   "shared": [{ "identifier": "quiz", "resourceRef": "quiz.html" }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;

use crate::activity::{ControlMode, LimitConditions, PrimaryObjective};
use crate::rollup::{RollupControls, RollupPolicy, RollupRule};
use crate::rules::{
    ExitConditionAction, PostConditionAction, PreConditionAction, SequencingRule,
    SequencingRules,
};

/// A whole course structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTreeSpec {
    /// The organization (root activity).
    pub root: ActivitySpec,
    /// Definitions referenced from `children` by identifier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared: Vec<ActivitySpec>,
}

impl ActivityTreeSpec {
    /// A structure without shared definitions.
    pub fn new(root: ActivitySpec) -> Self {
        Self {
            root,
            shared: Vec::new(),
        }
    }

    /// Add a shared definition.
    #[must_use]
    pub fn with_shared(mut self, spec: ActivitySpec) -> Self {
        self.shared.push(spec);
        self
    }
}

/// One child entry: inline, or a reference into `shared`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildSpec {
    /// Identifier of a shared definition.
    Ref(ActivityId),
    /// Inline definition.
    Inline(Box<ActivitySpec>),
}

/// Control-mode flags as written on one activity. Unset flags inherit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlModeSpec {
    /// See [`ControlMode::choice`].
    pub choice: Option<bool>,
    /// See [`ControlMode::choice_exit`].
    pub choice_exit: Option<bool>,
    /// See [`ControlMode::flow`].
    pub flow: Option<bool>,
    /// See [`ControlMode::forward_only`].
    pub forward_only: Option<bool>,
}

impl ControlModeSpec {
    /// Fill unset flags from the parent's effective flags.
    pub fn resolve(&self, inherited: ControlMode) -> ControlMode {
        ControlMode {
            choice: self.choice.unwrap_or(inherited.choice),
            choice_exit: self.choice_exit.unwrap_or(inherited.choice_exit),
            flow: self.flow.unwrap_or(inherited.flow),
            forward_only: self.forward_only.unwrap_or(inherited.forward_only),
        }
    }
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_true(v: &bool) -> bool {
    *v
}

/// One activity as described by the manifest layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySpec {
    /// Unique identifier.
    pub identifier: ActivityId,
    /// Display title (defaults to empty).
    #[serde(default)]
    pub title: String,
    /// Ordered children; empty for leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildSpec>,
    /// Launchable resource (leaves only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<String>,
    /// Visible in navigation.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub is_visible: bool,
    /// Control-mode flags set on this activity.
    #[serde(default)]
    pub control_mode: ControlModeSpec,
    /// Pre, post and exit condition rules.
    #[serde(default)]
    pub sequencing_rules: SequencingRules,
    /// How this activity aggregates its children.
    #[serde(default)]
    pub rollup: RollupPolicy,
    /// How this activity contributes to its parent.
    #[serde(default)]
    pub rollup_controls: RollupControls,
    /// Attempt and duration limits.
    #[serde(default)]
    pub limit_conditions: LimitConditions,
    /// Primary objective configuration.
    #[serde(default)]
    pub primary_objective: PrimaryObjective,
    /// Identifiers of secondary objectives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objectives: Vec<String>,
}

impl ActivitySpec {
    /// A bare activity with no resource and no children.
    pub fn new(identifier: impl Into<ActivityId>) -> Self {
        let identifier = identifier.into();
        Self {
            title: identifier.to_string(),
            identifier,
            children: Vec::new(),
            resource_ref: None,
            is_visible: true,
            control_mode: ControlModeSpec::default(),
            sequencing_rules: SequencingRules::default(),
            rollup: RollupPolicy::default(),
            rollup_controls: RollupControls::default(),
            limit_conditions: LimitConditions::default(),
            primary_objective: PrimaryObjective::default(),
            objectives: Vec::new(),
        }
    }

    /// A launchable leaf whose resource is `<identifier>.html`.
    pub fn leaf(identifier: impl Into<ActivityId>) -> Self {
        let mut spec = Self::new(identifier);
        spec.resource_ref = Some(format!("{}.html", spec.identifier));
        spec
    }

    /// A cluster with inline children.
    pub fn cluster(
        identifier: impl Into<ActivityId>,
        children: impl IntoIterator<Item = ActivitySpec>,
    ) -> Self {
        let mut spec = Self::new(identifier);
        spec.children = children
            .into_iter()
            .map(|c| ChildSpec::Inline(Box::new(c)))
            .collect();
        spec
    }

    /// Append a reference to a shared definition.
    #[must_use]
    pub fn with_child_ref(mut self, identifier: impl Into<ActivityId>) -> Self {
        self.children.push(ChildSpec::Ref(identifier.into()));
        self
    }

    /// Drop the resource, making a leaf non-launchable.
    #[must_use]
    pub fn without_resource(mut self) -> Self {
        self.resource_ref = None;
        self
    }

    /// Mark invisible.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Set `flow`.
    #[must_use]
    pub fn flow(mut self, flow: bool) -> Self {
        self.control_mode.flow = Some(flow);
        self
    }

    /// Set `choice`.
    #[must_use]
    pub fn choice(mut self, choice: bool) -> Self {
        self.control_mode.choice = Some(choice);
        self
    }

    /// Set `choiceExit`.
    #[must_use]
    pub fn choice_exit(mut self, choice_exit: bool) -> Self {
        self.control_mode.choice_exit = Some(choice_exit);
        self
    }

    /// Set `forwardOnly`.
    #[must_use]
    pub fn forward_only(mut self, forward_only: bool) -> Self {
        self.control_mode.forward_only = Some(forward_only);
        self
    }

    /// Append a pre-condition rule.
    #[must_use]
    pub fn with_pre_rule(mut self, rule: SequencingRule<PreConditionAction>) -> Self {
        self.sequencing_rules.pre_condition.push(rule);
        self
    }

    /// Append a post-condition rule.
    #[must_use]
    pub fn with_post_rule(mut self, rule: SequencingRule<PostConditionAction>) -> Self {
        self.sequencing_rules.post_condition.push(rule);
        self
    }

    /// Append an exit-condition rule.
    #[must_use]
    pub fn with_exit_rule(mut self, rule: SequencingRule<ExitConditionAction>) -> Self {
        self.sequencing_rules.exit_condition.push(rule);
        self
    }

    /// Replace the rollup policy.
    #[must_use]
    pub fn with_rollup(mut self, rollup: RollupPolicy) -> Self {
        self.rollup = rollup;
        self
    }

    /// Append a rollup rule.
    #[must_use]
    pub fn with_rollup_rule(mut self, rule: RollupRule) -> Self {
        self.rollup.rules.push(rule);
        self
    }

    /// Exclude this activity from its parent's rollup.
    #[must_use]
    pub fn excluded_from_rollup(mut self) -> Self {
        self.rollup_controls.excluded_from_rollup = true;
        self
    }

    /// Limit the number of attempts.
    #[must_use]
    pub fn with_attempt_limit(mut self, limit: u32) -> Self {
        self.limit_conditions.attempt_limit = Some(limit);
        self
    }

    /// Name the primary objective.
    #[must_use]
    pub fn with_primary_objective(mut self, objective_id: impl Into<String>) -> Self {
        self.primary_objective.id = Some(objective_id.into());
        self
    }

    /// Decide satisfaction from the objective measure.
    #[must_use]
    pub fn satisfied_by_measure(mut self, min_normalized_measure: f64) -> Self {
        self.primary_objective.satisfied_by_measure = true;
        self.primary_objective.min_normalized_measure = min_normalized_measure;
        self
    }

    /// Add a secondary objective.
    #[must_use]
    pub fn with_objective(mut self, objective_id: impl Into<String>) -> Self {
        self.objectives.push(objective_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json() {
        let spec: ActivityTreeSpec = serde_json::from_str(
            r#"{
                "root": {
                    "identifier": "course",
                    "children": [
                        {"identifier": "intro", "resourceRef": "intro.html"},
                        "quiz"
                    ]
                },
                "shared": [{"identifier": "quiz", "resourceRef": "quiz.html"}]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.root.children.len(), 2);
        assert!(matches!(&spec.root.children[0], ChildSpec::Inline(c) if c.identifier.as_str() == "intro"));
        assert_eq!(spec.root.children[1], ChildSpec::Ref(ActivityId::from("quiz")));
        assert!(spec.root.is_visible);
        assert_eq!(spec.shared.len(), 1);
    }

    #[test]
    fn control_mode_resolution() {
        let own = ControlModeSpec {
            flow: Some(false),
            ..ControlModeSpec::default()
        };
        let inherited = ControlMode {
            forward_only: true,
            ..ControlMode::default()
        };
        let resolved = own.resolve(inherited);
        assert!(!resolved.flow);
        assert!(resolved.forward_only);
        assert!(resolved.choice);
    }

    #[test]
    fn leaf_gets_resource() {
        let leaf = ActivitySpec::leaf("sco-1");
        assert_eq!(leaf.resource_ref.as_deref(), Some("sco-1.html"));
        assert_eq!(leaf.title, "sco-1");
    }

    #[test]
    fn serializes_without_defaults_noise() {
        let json = serde_json::to_value(ActivitySpec::leaf("a")).unwrap();
        assert!(json.get("children").is_none());
        assert!(json.get("isVisible").is_none());
        assert_eq!(json["resourceRef"], "a.html");
    }
}
