//! Tree construction.
//!
//! [`TreeBuilder::build`] walks the structure depth-first with two sets: the
//! identifiers on the current path (a reference to one of them is a back-edge)
//! and every identifier placed so far (seeing one again means a node would get
//! a second parent). Nodes are pushed in pre-order, so arena order is the
//! traversal order used by flow navigation.

use std::collections::{HashMap, HashSet};

use sn_core::{ActivityId, TreeError};
use tracing::{debug, warn};

use crate::activity::{Activity, ActivityIdx, ControlMode, Objective, ObjectiveState, TrackedState};
use crate::rollup::ChildActivitySet;
use crate::rules::{RuleCondition, RuleConditionKind, SequencingRules};
use crate::spec::{ActivitySpec, ActivityTreeSpec, ChildSpec};
use crate::tree::ActivityTree;

/// Limits and defaults applied while building.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Deepest allowed activity (root = 0).
    pub max_depth: usize,
    /// Largest allowed number of activities.
    pub max_activities: usize,
    /// Flags used where neither an activity nor any ancestor sets one.
    pub control_defaults: ControlMode,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_activities: 10_000,
            control_defaults: ControlMode::default(),
        }
    }
}

/// Builds [`ActivityTree`]s from [`ActivityTreeSpec`]s.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    options: BuildOptions,
}

impl TreeBuilder {
    /// Create a builder with the given options.
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Build a tree, rejecting structurally invalid input.
    pub fn build(&self, spec: &ActivityTreeSpec) -> Result<ActivityTree, TreeError> {
        let mut shared = HashMap::with_capacity(spec.shared.len());
        for def in &spec.shared {
            if shared.insert(def.identifier.as_str(), def).is_some() {
                return Err(TreeError::DuplicateIdentifier {
                    activity_id: def.identifier.clone(),
                });
            }
        }

        let mut state = BuildState {
            options: &self.options,
            shared,
            used_shared: HashSet::new(),
            nodes: Vec::new(),
            index: HashMap::new(),
            on_path: HashSet::new(),
        };
        let _ = state.visit(&spec.root, None, 0, self.options.control_defaults)?;

        for def in &spec.shared {
            if !state.used_shared.contains(def.identifier.as_str()) {
                warn!(activity_id = %def.identifier, "shared activity definition is never referenced");
            }
        }

        let tree = ActivityTree::from_parts(state.nodes, state.index);
        debug!(
            root = %tree.get(tree.root()).id,
            activities = tree.len(),
            "activity tree built"
        );
        Ok(tree)
    }

    /// Build a tree from a root definition without shared definitions.
    pub fn build_root(&self, root: ActivitySpec) -> Result<ActivityTree, TreeError> {
        self.build(&ActivityTreeSpec::new(root))
    }
}

struct BuildState<'a> {
    options: &'a BuildOptions,
    shared: HashMap<&'a str, &'a ActivitySpec>,
    used_shared: HashSet<&'a str>,
    nodes: Vec<Activity>,
    index: HashMap<ActivityId, ActivityIdx>,
    on_path: HashSet<&'a str>,
}

impl<'a> BuildState<'a> {
    fn visit(
        &mut self,
        spec: &'a ActivitySpec,
        parent: Option<ActivityIdx>,
        depth: usize,
        inherited: ControlMode,
    ) -> Result<ActivityIdx, TreeError> {
        if depth > self.options.max_depth {
            return Err(TreeError::DepthExceeded {
                activity_id: spec.identifier.clone(),
                depth,
                max_depth: self.options.max_depth,
            });
        }
        if self.index.contains_key(&spec.identifier) {
            return Err(TreeError::DuplicateIdentifier {
                activity_id: spec.identifier.clone(),
            });
        }
        if self.nodes.len() >= self.options.max_activities {
            return Err(TreeError::TooManyActivities {
                max_activities: self.options.max_activities,
            });
        }
        validate_activity(spec)?;

        let control_mode = spec.control_mode.resolve(inherited);
        let idx = ActivityIdx(self.nodes.len());
        self.nodes.push(new_activity(spec, parent, depth, control_mode));
        let _ = self.index.insert(spec.identifier.clone(), idx);
        let _ = self.on_path.insert(spec.identifier.as_str());

        for child in &spec.children {
            let child_spec: &'a ActivitySpec = match child {
                ChildSpec::Inline(inline) => &**inline,
                ChildSpec::Ref(id) => {
                    if self.on_path.contains(id.as_str()) {
                        return Err(TreeError::Cycle {
                            activity_id: id.clone(),
                            parent_id: spec.identifier.clone(),
                        });
                    }
                    let Some(def) = self.shared.get(id.as_str()).copied() else {
                        return Err(TreeError::DanglingReference {
                            parent_id: spec.identifier.clone(),
                            activity_id: id.clone(),
                        });
                    };
                    let _ = self.used_shared.insert(def.identifier.as_str());
                    def
                }
            };
            let child_idx = self.visit(child_spec, Some(idx), depth + 1, control_mode)?;
            self.nodes[idx.0].children.push(child_idx);
        }

        let _ = self.on_path.remove(spec.identifier.as_str());
        Ok(idx)
    }
}

fn new_activity(
    spec: &ActivitySpec,
    parent: Option<ActivityIdx>,
    depth: usize,
    control_mode: ControlMode,
) -> Activity {
    let resource_ref = if spec.children.is_empty() {
        spec.resource_ref.clone()
    } else {
        if spec.resource_ref.is_some() {
            warn!(activity_id = %spec.identifier, "ignoring resource on a cluster activity");
        }
        None
    };
    Activity {
        id: spec.identifier.clone(),
        title: spec.title.clone(),
        parent,
        children: Vec::with_capacity(spec.children.len()),
        depth,
        resource_ref,
        is_visible: spec.is_visible,
        is_active: false,
        is_suspended: false,
        control_mode,
        sequencing_rules: spec.sequencing_rules.clone(),
        rollup_policy: spec.rollup.clone(),
        rollup_controls: spec.rollup_controls.clone(),
        limits: spec.limit_conditions.clone(),
        primary_objective: spec.primary_objective.clone(),
        objectives: spec
            .objectives
            .iter()
            .map(|id| Objective {
                id: id.clone(),
                state: ObjectiveState::default(),
            })
            .collect(),
        state: TrackedState::default(),
    }
}

// ── Range validation ──

fn validate_activity(spec: &ActivitySpec) -> Result<(), TreeError> {
    let id = &spec.identifier;
    if id.trim().is_empty() {
        return Err(TreeError::invalid(id, "identifier must not be empty"));
    }

    let in_range = |name: &str, value: f64, lo: f64| {
        if (lo..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(TreeError::invalid(id, format!("{name} {value} is outside {lo:.1}..=1.0")))
        }
    };
    in_range("objectiveMeasureWeight", spec.rollup_controls.objective_measure_weight, 0.0)?;
    in_range("minNormalizedMeasure", spec.primary_objective.min_normalized_measure, -1.0)?;
    let child_sets = std::iter::once(spec.rollup.consideration)
        .chain(spec.rollup.rules.iter().map(|r| r.child_activity_set));
    for set in child_sets {
        if let ChildActivitySet::AtLeastPercent(p) = set {
            in_range("atLeastPercent", p, 0.0)?;
        }
    }
    for condition in rule_conditions(&spec.sequencing_rules) {
        if let RuleConditionKind::ObjectiveMeasureGreaterThan { threshold }
        | RuleConditionKind::ObjectiveMeasureLessThan { threshold } = condition.kind
        {
            in_range("measure threshold", threshold, -1.0)?;
        }
    }

    let mut seen = HashSet::new();
    for objective in &spec.objectives {
        if !seen.insert(objective.as_str())
            || spec.primary_objective.id.as_deref() == Some(objective.as_str())
        {
            return Err(TreeError::invalid(
                id,
                format!("objective {objective} is declared twice"),
            ));
        }
    }
    Ok(())
}

fn rule_conditions(rules: &SequencingRules) -> impl Iterator<Item = &RuleCondition> {
    rules
        .pre_condition
        .iter()
        .flat_map(|r| &r.conditions)
        .chain(rules.post_condition.iter().flat_map(|r| &r.conditions))
        .chain(rules.exit_condition.iter().flat_map(|r| &r.conditions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::RollupPolicy;
    use crate::rules::{PreConditionAction, SequencingRule};
    use assert_matches::assert_matches;
    use sn_core::logging::capture_logs;
    use tracing::Level;

    fn ids(tree: &ActivityTree) -> Vec<&str> {
        tree.preorder().into_iter().map(|i| tree.get(i).id.as_str()).collect()
    }

    fn chain(len: usize) -> ActivitySpec {
        let mut spec = ActivitySpec::leaf(format!("n{len}"));
        for i in (0..len).rev() {
            spec = ActivitySpec::cluster(format!("n{i}"), [spec]);
        }
        spec
    }

    // ── construction ────────────────────────────────────────────────

    #[test]
    fn builds_in_preorder() {
        let tree = TreeBuilder::default()
            .build_root(ActivitySpec::cluster(
                "root",
                [
                    ActivitySpec::cluster("a", [ActivitySpec::leaf("a1"), ActivitySpec::leaf("a2")]),
                    ActivitySpec::leaf("b"),
                ],
            ))
            .unwrap();
        assert_eq!(ids(&tree), ["root", "a", "a1", "a2", "b"]);
        let a1 = tree.find_activity("a1").unwrap();
        assert_eq!(tree.get(a1).depth, 2);
        assert_eq!(tree.get(tree.parent(a1).unwrap()).id.as_str(), "a");
    }

    #[test]
    fn shared_definitions_are_resolved() {
        let spec = ActivityTreeSpec::new(
            ActivitySpec::cluster("root", [ActivitySpec::leaf("intro")]).with_child_ref("quiz"),
        )
        .with_shared(ActivitySpec::leaf("quiz"));
        let tree = TreeBuilder::default().build(&spec).unwrap();
        assert_eq!(ids(&tree), ["root", "intro", "quiz"]);
    }

    #[test]
    fn control_mode_inherits_and_overrides() {
        let tree = TreeBuilder::default()
            .build_root(
                ActivitySpec::cluster(
                    "root",
                    [ActivitySpec::cluster("m", [ActivitySpec::leaf("l")]).flow(false)],
                )
                .forward_only(true),
            )
            .unwrap();
        let m = tree.get(tree.find_activity("m").unwrap());
        let l = tree.get(tree.find_activity("l").unwrap());
        assert!(!m.control_mode.flow);
        assert!(m.control_mode.forward_only);
        assert!(!l.control_mode.flow);
        assert!(l.control_mode.forward_only);
    }

    #[test]
    fn configured_defaults_apply_at_root() {
        let builder = TreeBuilder::new(BuildOptions {
            control_defaults: ControlMode {
                choice: false,
                ..ControlMode::default()
            },
            ..BuildOptions::default()
        });
        let tree = builder
            .build_root(ActivitySpec::cluster("root", [ActivitySpec::leaf("a").choice(true)]))
            .unwrap();
        assert!(!tree.get(tree.root()).control_mode.choice);
        assert!(tree.activity_by_id("a").unwrap().control_mode.choice);
    }

    #[test]
    fn cluster_resource_is_dropped() {
        let (logs, _guard) = capture_logs();
        let mut root = ActivitySpec::cluster("root", [ActivitySpec::leaf("a")]);
        root.resource_ref = Some("root.html".into());
        let tree = TreeBuilder::default().build_root(root).unwrap();
        assert!(tree.get(tree.root()).resource_ref.is_none());
        assert!(logs.has_event(Level::WARN, "resource on a cluster"));
    }

    #[test]
    fn unused_shared_definition_warns() {
        let (logs, _guard) = capture_logs();
        let spec = ActivityTreeSpec::new(ActivitySpec::cluster("root", [ActivitySpec::leaf("a")]))
            .with_shared(ActivitySpec::leaf("orphan"));
        let _ = TreeBuilder::default().build(&spec).unwrap();
        let warned = logs.at_level(Level::WARN);
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0].field("activity_id"), Some("orphan"));
    }

    // ── structural guards ───────────────────────────────────────────

    #[test]
    fn back_edge_is_a_cycle() {
        let spec = ActivityTreeSpec::new(ActivitySpec::new("root").with_child_ref("m"))
            .with_shared(ActivitySpec::new("m").with_child_ref("root"));
        let err = TreeBuilder::default().build(&spec).unwrap_err();
        assert_matches!(err, TreeError::Cycle { activity_id, parent_id } => {
            assert_eq!(activity_id.as_str(), "root");
            assert_eq!(parent_id.as_str(), "m");
        });
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let spec = ActivityTreeSpec::new(ActivitySpec::new("root").with_child_ref("loop"))
            .with_shared(ActivitySpec::new("loop").with_child_ref("loop"));
        assert_matches!(
            TreeBuilder::default().build(&spec),
            Err(TreeError::Cycle { .. })
        );
    }

    #[test]
    fn dangling_reference() {
        let spec = ActivityTreeSpec::new(ActivitySpec::new("root").with_child_ref("ghost"));
        let err = TreeBuilder::default().build(&spec).unwrap_err();
        assert_eq!(
            err,
            TreeError::DanglingReference {
                parent_id: "root".into(),
                activity_id: "ghost".into(),
            }
        );
    }

    #[test]
    fn shared_node_referenced_twice_has_two_parents() {
        let spec = ActivityTreeSpec::new(
            ActivitySpec::cluster(
                "root",
                [
                    ActivitySpec::new("a").with_child_ref("s"),
                    ActivitySpec::new("b").with_child_ref("s"),
                ],
            ),
        )
        .with_shared(ActivitySpec::leaf("s"));
        assert_matches!(
            TreeBuilder::default().build(&spec),
            Err(TreeError::DuplicateIdentifier { activity_id }) if activity_id.as_str() == "s"
        );
    }

    #[test]
    fn duplicate_inline_identifier() {
        let spec = ActivitySpec::cluster("root", [ActivitySpec::leaf("x"), ActivitySpec::leaf("x")]);
        assert_matches!(
            TreeBuilder::default().build_root(spec),
            Err(TreeError::DuplicateIdentifier { .. })
        );
    }

    #[test]
    fn depth_limit() {
        let builder = TreeBuilder::new(BuildOptions {
            max_depth: 3,
            ..BuildOptions::default()
        });
        assert!(builder.build_root(chain(3)).is_ok());
        assert_matches!(
            builder.build_root(chain(4)),
            Err(TreeError::DepthExceeded { depth: 4, max_depth: 3, .. })
        );
    }

    #[test]
    fn size_limit() {
        let builder = TreeBuilder::new(BuildOptions {
            max_activities: 3,
            ..BuildOptions::default()
        });
        let spec = ActivitySpec::cluster(
            "root",
            [ActivitySpec::leaf("a"), ActivitySpec::leaf("b"), ActivitySpec::leaf("c")],
        );
        assert_eq!(
            builder.build_root(spec).unwrap_err(),
            TreeError::TooManyActivities { max_activities: 3 }
        );
    }

    // ── range validation ────────────────────────────────────────────

    #[test]
    fn rejects_out_of_range_weight() {
        let mut leaf = ActivitySpec::leaf("a");
        leaf.rollup_controls.objective_measure_weight = 1.5;
        let err = TreeBuilder::default()
            .build_root(ActivitySpec::cluster("root", [leaf]))
            .unwrap_err();
        assert_eq!(err.category(), "invalid_activity");
        assert!(err.to_string().contains("objectiveMeasureWeight"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let rule = SequencingRule::all(
            vec![RuleCondition::new(RuleConditionKind::ObjectiveMeasureLessThan {
                threshold: -2.0,
            })],
            PreConditionAction::Skip,
        );
        let spec = ActivitySpec::leaf("a").with_pre_rule(rule);
        assert_matches!(
            TreeBuilder::default().build_root(spec),
            Err(TreeError::InvalidActivity { .. })
        );
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let spec = ActivitySpec::cluster("root", [ActivitySpec::leaf("a")]).with_rollup(RollupPolicy {
            consideration: ChildActivitySet::AtLeastPercent(1.2),
            rules: Vec::new(),
        });
        assert!(TreeBuilder::default().build_root(spec).is_err());
    }

    #[test]
    fn rejects_duplicate_objective() {
        let spec = ActivitySpec::leaf("a")
            .with_primary_objective("obj")
            .with_objective("obj");
        assert!(TreeBuilder::default().build_root(spec).is_err());
    }
}
