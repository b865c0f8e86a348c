//! The navigation request state machine.
//!
//! Session status moves `NotStarted → Active ⇄ Suspended → Terminated`; while
//! `Active` the current activity is the fine-grained position. Every request
//! is processed against a checkpoint of the tree and session state, and a
//! denied request restores it.

use chrono::Utc;
use sn_core::{ActivityId, SequencingError};
use sn_rollup::{RollupEngine, RollupOptions, RollupReport};
use sn_rules::RuleEvaluator;
use sn_tree::{
    Activity, ActivityIdx, ActivityTree, ControlMode, ExitConditionAction, PostConditionAction,
    SYNCED_FIELDS, TrackedValue, TrackingAdapter,
};
use tracing::{debug, info, warn};

use crate::availability::NavigationAvailability;
use crate::choice;
use crate::outcome::{DenialReason, NavigationOutcome};
use crate::request::{NavigationRequest, NavigationRequestKind};
use crate::status::SessionStatus;
use crate::traversal::{Direction, FlowTraversal};

/// Handler behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Rollup behavior.
    pub rollup: RollupOptions,
    /// Clear completion and progress when a new attempt begins on an
    /// activity that was attempted before.
    pub reset_progress_on_new_attempt: bool,
    /// Pull tracked values from the adapter when a leaf's attempt ends.
    pub sync_tracking_on_attempt_end: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            rollup: RollupOptions::default(),
            reset_progress_on_new_attempt: false,
            sync_tracking_on_attempt_end: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct SessionState {
    status: SessionStatus,
    current: Option<ActivityIdx>,
    suspended: Option<ActivityIdx>,
    root_has_begun: bool,
}

/// Where the departure sequence left the learner.
enum Departure {
    /// Continue traversal from `position`, optionally in a new direction.
    Position {
        position: ActivityIdx,
        direction: Option<Direction>,
    },
    /// Start a new attempt on `position`.
    Retry(ActivityIdx),
    /// End the session.
    Terminate,
}

/// Processes navigation requests against one activity tree.
pub struct NavigationHandler {
    tree: ActivityTree,
    rules: RuleEvaluator,
    rollup: RollupEngine,
    options: HandlerOptions,
    state: SessionState,
    tracking: Option<Box<dyn TrackingAdapter>>,
}

impl NavigationHandler {
    /// Create a handler for a freshly built tree.
    pub fn new(tree: ActivityTree, options: HandlerOptions) -> Self {
        Self {
            tree,
            rules: RuleEvaluator::new(),
            rollup: RollupEngine::new(options.rollup),
            options,
            state: SessionState::default(),
            tracking: None,
        }
    }

    /// Attach the RTE's tracking adapter.
    #[must_use]
    pub fn with_tracking(mut self, adapter: Box<dyn TrackingAdapter>) -> Self {
        self.tracking = Some(adapter);
        self
    }

    // ── Accessors ──

    /// The activity tree.
    pub fn tree(&self) -> &ActivityTree {
        &self.tree
    }

    /// Lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// The current activity.
    pub fn current(&self) -> Option<ActivityIdx> {
        self.state.current
    }

    /// Identifier of the current activity.
    pub fn current_id(&self) -> Option<&ActivityId> {
        self.state.current.map(|idx| self.tree.id(idx))
    }

    /// The activity `resumeAll` returns to.
    pub fn suspended(&self) -> Option<ActivityIdx> {
        self.state.suspended
    }

    /// Identifier of the suspended activity.
    pub fn suspended_id(&self) -> Option<&ActivityId> {
        self.state.suspended.map(|idx| self.tree.id(idx))
    }

    /// Whether the root's first attempt has begun.
    pub fn root_has_begun(&self) -> bool {
        self.state.root_has_begun
    }

    /// Control modes of the cluster governing navigation from the current
    /// activity: its parent, or the root before anything is delivered.
    pub fn governing_control_mode(&self) -> ControlMode {
        let cluster = self
            .state
            .current
            .and_then(|idx| self.tree.parent(idx))
            .unwrap_or_else(|| self.tree.root());
        self.tree.get(cluster).control_mode
    }

    /// Which requests are currently plausible.
    pub fn availability(&self) -> NavigationAvailability {
        NavigationAvailability::of(self)
    }

    /// Whether a request type is accepted in `status`.
    pub fn is_valid_for_status(kind: NavigationRequestKind, status: SessionStatus) -> bool {
        use NavigationRequestKind as Kind;
        match kind {
            Kind::Start => status == SessionStatus::NotStarted,
            Kind::ResumeAll => status == SessionStatus::Suspended,
            Kind::Continue | Kind::Previous | Kind::UnqualifiedExit | Kind::SuspendAll => {
                status == SessionStatus::Active
            }
            Kind::Choice => matches!(status, SessionStatus::NotStarted | SessionStatus::Active),
            Kind::ExitAll => matches!(status, SessionStatus::Active | SessionStatus::Suspended),
        }
    }

    // ── Requests ──

    /// Process one navigation request.
    ///
    /// Not-allowed requests come back as [`NavigationOutcome::Denied`] with
    /// the tree and session untouched. Only programming errors, such as a
    /// choice of an activity that does not exist, are errors.
    pub fn process(&mut self, request: &NavigationRequest) -> Result<NavigationOutcome, SequencingError> {
        debug!(%request, status = %self.state.status, "processing navigation request");
        let checkpoint = (self.tree.clone(), self.state.clone());
        let result = self.dispatch(request);
        match &result {
            Ok(NavigationOutcome::Denied { reason }) => {
                (self.tree, self.state) = checkpoint;
                info!(%request, code = reason.code(), %reason, "navigation request denied");
            }
            Err(error) => {
                (self.tree, self.state) = checkpoint;
                warn!(%request, category = error.category(), %error, "navigation request failed");
            }
            Ok(outcome) => debug!(%request, ?outcome, "navigation request processed"),
        }
        result
    }

    fn dispatch(&mut self, request: &NavigationRequest) -> Result<NavigationOutcome, SequencingError> {
        let status = self.state.status;
        if status == SessionStatus::Terminated {
            return Ok(DenialReason::SessionTerminated.into());
        }
        let kind = request.kind();
        if !Self::is_valid_for_status(kind, status) {
            return Ok(DenialReason::InvalidRequestForState { request: kind, status }.into());
        }

        let outcome = match request {
            NavigationRequest::Start => self.start(),
            NavigationRequest::ResumeAll => self.resume_all(),
            NavigationRequest::Continue => self.flow(Direction::Forward),
            NavigationRequest::Previous => self.flow(Direction::Backward),
            NavigationRequest::Choice { target_activity_id } => {
                let target = self
                    .tree
                    .find_activity(target_activity_id)
                    .ok_or_else(|| SequencingError::ActivityNotFound(target_activity_id.clone()))?;
                self.choice(target)
            }
            NavigationRequest::UnqualifiedExit => self.unqualified_exit(),
            NavigationRequest::ExitAll => Ok(self.terminate_all()),
            NavigationRequest::SuspendAll => self.suspend_all(),
        };
        Ok(outcome.unwrap_or_else(NavigationOutcome::from))
    }

    fn start(&mut self) -> Result<NavigationOutcome, DenialReason> {
        let target = FlowTraversal::new(&self.tree).first_from_root().into_result()?;
        Ok(self.deliver(target))
    }

    fn resume_all(&mut self) -> Result<NavigationOutcome, DenialReason> {
        let target = self.state.suspended.ok_or(DenialReason::NothingSuspended)?;
        for idx in self.tree.path_from_root(target) {
            self.tree.get_mut(idx).is_suspended = false;
        }
        self.state.suspended = None;
        self.state.current = Some(target);
        self.state.status = SessionStatus::Active;
        self.publish(target);

        let activity_id = self.tree.id(target).clone();
        info!(%activity_id, "session resumed");
        Ok(NavigationOutcome::Delivered { activity_id })
    }

    fn flow(&mut self, direction: Direction) -> Result<NavigationOutcome, DenialReason> {
        let current = self.state.current.ok_or(DenialReason::NoCurrentActivity)?;
        let departure = if self.tree.get(current).is_active {
            self.depart(current)
        } else {
            Departure::Position {
                position: current,
                direction: None,
            }
        };

        match departure {
            Departure::Terminate => Ok(self.terminate_all()),
            Departure::Retry(position) => self.retry(position),
            Departure::Position { position, direction: redirect } => {
                if position == self.tree.root() && !self.tree.get(position).is_active {
                    return Ok(self.terminate_all());
                }
                let direction = redirect.unwrap_or(direction);
                let next = FlowTraversal::new(&self.tree)
                    .next_from(position, direction)
                    .into_result()?;
                Ok(self.deliver(next))
            }
        }
    }

    fn choice(&mut self, target: ActivityIdx) -> Result<NavigationOutcome, DenialReason> {
        let current = self.state.current;
        if current == Some(target) && self.tree.get(target).is_active {
            return Ok(NavigationOutcome::Delivered {
                activity_id: self.tree.id(target).clone(),
            });
        }

        let leaf = choice::check_choice(&self.tree, current, target)?;
        if let Some(current) = current.filter(|&c| self.tree.get(c).is_active) {
            match self.depart(current) {
                Departure::Terminate => return Ok(self.terminate_all()),
                Departure::Retry(position) => return self.retry(position),
                // The chosen target wins over flow redirects.
                Departure::Position { .. } => {}
            }
        }
        Ok(self.deliver(leaf))
    }

    fn unqualified_exit(&mut self) -> Result<NavigationOutcome, DenialReason> {
        let current = self
            .state
            .current
            .filter(|&c| self.tree.get(c).is_active)
            .ok_or(DenialReason::NoCurrentActivity)?;

        self.end_attempt(current);
        let _ = self.rollup.rollup(&mut self.tree, current);
        let position = self.apply_exit_rules(current);
        if position == self.tree.root() {
            return Ok(self.terminate_all());
        }

        let activity_id = self.tree.id(current).clone();
        info!(%activity_id, "attempt exited");
        Ok(NavigationOutcome::Exited { activity_id })
    }

    fn suspend_all(&mut self) -> Result<NavigationOutcome, DenialReason> {
        let current = self.state.current.ok_or(DenialReason::NoCurrentActivity)?;
        for idx in self.tree.path_from_root(current) {
            self.tree.get_mut(idx).is_suspended = true;
        }
        self.state.suspended = Some(current);
        self.state.status = SessionStatus::Suspended;

        let activity_id = self.tree.id(current).clone();
        info!(%activity_id, "session suspended");
        Ok(NavigationOutcome::Suspended { activity_id })
    }

    // ── Tracking and rollup ──

    /// Apply a value reported by the RTE and roll up from its activity.
    ///
    /// Returns whether the activity's state changed.
    pub fn report_tracking(
        &mut self,
        activity_id: &ActivityId,
        value: &TrackedValue,
    ) -> Result<bool, SequencingError> {
        let idx = self.find(activity_id)?;
        let changed = self.tree.apply_tracked_value(idx, value);
        if changed {
            let _ = self.rollup.rollup(&mut self.tree, idx);
        }
        Ok(changed)
    }

    /// Roll up from `activity_id` toward the root.
    pub fn rollup(&mut self, activity_id: &ActivityId) -> Result<RollupReport, SequencingError> {
        let idx = self.find(activity_id)?;
        Ok(self.rollup.rollup(&mut self.tree, idx))
    }

    fn find(&self, activity_id: &ActivityId) -> Result<ActivityIdx, SequencingError> {
        self.tree
            .find_activity(activity_id)
            .ok_or_else(|| SequencingError::ActivityNotFound(activity_id.clone()))
    }

    // ── Attempts ──

    /// End the current attempt and apply rollup, exit and post-condition
    /// rules, in that order.
    fn depart(&mut self, current: ActivityIdx) -> Departure {
        self.end_attempt(current);
        let _ = self.rollup.rollup(&mut self.tree, current);
        let mut position = self.apply_exit_rules(current);

        loop {
            let Some(action) = self.rules.evaluate_post_condition_rules(self.tree.get(position)) else {
                return Departure::Position {
                    position,
                    direction: None,
                };
            };
            debug!(activity_id = %self.tree.id(position), ?action, "post-condition rule fired");
            let direction = match action {
                PostConditionAction::ExitParent => {
                    let Some(parent) = self.tree.parent(position) else {
                        return Departure::Terminate;
                    };
                    self.end_subtree(parent);
                    position = parent;
                    continue;
                }
                PostConditionAction::ExitAll => return Departure::Terminate,
                PostConditionAction::Retry => return Departure::Retry(position),
                PostConditionAction::RetryAll => return Departure::Retry(self.tree.root()),
                PostConditionAction::Continue => Direction::Forward,
                PostConditionAction::Previous => Direction::Backward,
            };
            return Departure::Position {
                position,
                direction: Some(direction),
            };
        }
    }

    /// Exit-condition rules on the active ancestors of `current`, root first.
    /// Returns the exited ancestor, or `current` when no rule fired.
    fn apply_exit_rules(&mut self, current: ActivityIdx) -> ActivityIdx {
        let ancestors = self.tree.ancestors(current);
        for &ancestor in ancestors.iter().rev() {
            let activity = self.tree.get(ancestor);
            if !activity.is_active {
                continue;
            }
            if self.rules.evaluate_exit_condition_rules(activity) == Some(ExitConditionAction::Exit) {
                debug!(activity_id = %activity.id, "exit-condition rule fired");
                self.end_subtree(ancestor);
                return ancestor;
            }
        }
        current
    }

    fn retry(&mut self, position: ActivityIdx) -> Result<NavigationOutcome, DenialReason> {
        self.end_subtree(position);
        for idx in self.subtree(position) {
            self.tree.get_mut(idx).reset_tracking();
        }
        let _ = self.rollup.rollup(&mut self.tree, position);
        info!(activity_id = %self.tree.id(position), "retrying activity");

        let target = if self.tree.is_leaf(position) {
            position
        } else {
            FlowTraversal::new(&self.tree)
                .enter(position, Direction::Forward)
                .into_result()?
        };
        Ok(self.deliver(target))
    }

    /// End every open attempt and terminate the session, whatever its
    /// status. `exitAll` lands here once validated.
    pub fn terminate_all(&mut self) -> NavigationOutcome {
        let root = self.tree.root();
        self.end_subtree(root);
        if let Some(current) = self.state.current {
            let _ = self.rollup.rollup(&mut self.tree, current);
        }
        for idx in self.tree.preorder() {
            self.tree.get_mut(idx).is_suspended = false;
        }
        self.state.suspended = None;
        self.state.status = SessionStatus::Terminated;
        info!(current = ?self.current_id(), "session terminated");
        NavigationOutcome::Terminated
    }

    /// End `idx` and every active descendant, deepest first.
    fn end_subtree(&mut self, idx: ActivityIdx) {
        for node in self.subtree(idx).into_iter().rev() {
            if self.tree.get(node).is_active {
                self.end_attempt(node);
            }
        }
    }

    /// `idx` followed by its descendants in pre-order.
    fn subtree(&self, idx: ActivityIdx) -> Vec<ActivityIdx> {
        let mut nodes = vec![idx];
        nodes.extend(self.tree.descendants(idx));
        nodes
    }

    fn end_attempt(&mut self, idx: ActivityIdx) {
        if self.options.sync_tracking_on_attempt_end && self.tree.is_leaf(idx) {
            if let Some(adapter) = &self.tracking {
                let activity_id = self.tree.id(idx).clone();
                for field in SYNCED_FIELDS {
                    if let Some(value) = adapter.get_tracked_value(&activity_id, field) {
                        let _ = self.tree.apply_tracked_value(idx, &value);
                    }
                }
            }
        }
        self.tree.get_mut(idx).is_active = false;
        debug!(activity_id = %self.tree.id(idx), "attempt ended");
    }

    fn begin_attempt(&mut self, idx: ActivityIdx) {
        let reset = self.options.reset_progress_on_new_attempt;
        let activity = self.tree.get_mut(idx);
        activity.state.attempt_count = activity.state.attempt_count.saturating_add(1);
        activity.state.attempt_started_at = Some(Utc::now());
        activity.state.attempt_elapsed_ms = None;
        activity.is_active = true;
        activity.is_suspended = false;
        if reset && activity.state.attempt_count > 1 {
            activity.reset_attempt_progress();
        }
        debug!(
            activity_id = %activity.id,
            attempt = activity.state.attempt_count,
            "attempt begun"
        );
    }

    /// Make `target` current: end attempts off its path and begin attempts
    /// on every path activity without one.
    fn deliver(&mut self, target: ActivityIdx) -> NavigationOutcome {
        let path = self.tree.path_from_root(target);
        let stale: Vec<ActivityIdx> = self
            .tree
            .iter()
            .filter(|(idx, activity)| activity.is_active && !path.contains(idx))
            .map(|(idx, _)| idx)
            .collect();
        for idx in stale.into_iter().rev() {
            self.end_attempt(idx);
        }
        for &idx in &path {
            if !self.tree.get(idx).is_active {
                self.begin_attempt(idx);
            }
        }

        self.state.current = Some(target);
        self.state.status = SessionStatus::Active;
        self.state.root_has_begun = true;
        self.publish(target);

        let activity: &Activity = self.tree.get(target);
        info!(
            activity_id = %activity.id,
            attempt = activity.state.attempt_count,
            "activity delivered"
        );
        NavigationOutcome::Delivered {
            activity_id: activity.id.clone(),
        }
    }

    /// Push the delivered activity's state to the RTE.
    fn publish(&mut self, idx: ActivityIdx) {
        if let Some(adapter) = self.tracking.as_mut() {
            let activity_id = self.tree.id(idx);
            for value in self.tree.tracked_values(idx) {
                adapter.set_tracked_value(activity_id, value);
            }
        }
    }
}
