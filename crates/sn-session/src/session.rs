//! The sequencing session.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use sn_core::{ActivityId, SequencingError, SessionId, SnError};
use sn_navigation::{HandlerOptions, NavigationHandler, NavigationRequest, SessionStatus};
use sn_rollup::{RollupOptions, RollupReport};
use sn_settings::SnSettings;
use sn_tree::{
    ActivityTreeSpec, BuildOptions, ControlMode, TrackedValue, TrackingAdapter, TreeBuilder,
};
use tracing::{debug, info, instrument, warn};

use crate::response::{Admitted, NavigationResponse, ResponseReason};
use crate::state::{LifecycleStatus, SequencingState};

enum SessionSlot {
    Uninitialized,
    Running(Box<NavigationHandler>),
    Closed,
}

/// Marks a navigation request as in flight until dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One loaded course and its activity tree.
///
/// All methods take `&self`; the session is `Send + Sync` and may be shared
/// behind an `Arc`. Every call that touches the tree runs alone; one arriving
/// meanwhile is answered with [`ResponseReason::Busy`] instead of waiting.
///
/// A [`TrackingAdapter`] is called while the session is locked and must not
/// call back into the session.
pub struct SequencingSession {
    id: SessionId,
    settings: SnSettings,
    slot: Mutex<SessionSlot>,
    in_flight: AtomicBool,
    published: RwLock<SequencingState>,
}

impl fmt::Debug for SequencingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequencingSession")
            .field("id", &self.id)
            .field("status", &self.published.read().status)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SequencingSession {
    /// Create an uninitialized session with a fresh id.
    pub fn new(settings: &SnSettings) -> Self {
        let id = SessionId::new();
        debug!(session_id = %id, "sequencing session created");
        Self {
            published: RwLock::new(SequencingState::uninitialized(id.clone())),
            id,
            settings: settings.clone(),
            slot: Mutex::new(SessionSlot::Uninitialized),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Settings the session was created with.
    pub fn settings(&self) -> &SnSettings {
        &self.settings
    }

    /// Whether a tree is loaded and the session has not ended.
    pub fn is_initialized(&self) -> bool {
        !matches!(
            self.published.read().status,
            LifecycleStatus::Uninitialized | LifecycleStatus::Terminated
        )
    }

    // ── Lifecycle ──

    /// Build the activity tree for `spec`.
    ///
    /// # Errors
    ///
    /// A structural [`SnError::Tree`] when the course cannot be built, or
    /// [`SequencingError::AlreadyInitialized`] on a second call.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub fn initialize(&self, spec: &ActivityTreeSpec) -> Result<(), SnError> {
        self.install(spec, None)
    }

    /// Like [`initialize`](Self::initialize), with an RTE tracking adapter.
    ///
    /// # Errors
    ///
    /// Same as [`initialize`](Self::initialize).
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub fn initialize_with_tracking(
        &self,
        spec: &ActivityTreeSpec,
        adapter: Box<dyn TrackingAdapter>,
    ) -> Result<(), SnError> {
        self.install(spec, Some(adapter))
    }

    fn install(
        &self,
        spec: &ActivityTreeSpec,
        adapter: Option<Box<dyn TrackingAdapter>>,
    ) -> Result<(), SnError> {
        // Requests only hold the lock of an uninitialized slot long enough to
        // reject themselves.
        let mut slot = self.slot.lock();
        if !matches!(*slot, SessionSlot::Uninitialized) {
            warn!("initialize called twice");
            return Err(SequencingError::AlreadyInitialized.into());
        }

        let tree = TreeBuilder::new(build_options(&self.settings))
            .build(spec)
            .inspect_err(|e| warn!(error = %e, category = e.category(), "activity tree rejected"))?;
        let stats = tree.stats();

        let mut handler = NavigationHandler::new(tree, handler_options(&self.settings));
        if let Some(adapter) = adapter {
            handler = handler.with_tracking(adapter);
        }
        self.publish(&handler);
        *slot = SessionSlot::Running(Box::new(handler));

        info!(
            total_activities = stats.total_activities,
            leaf_activities = stats.leaf_activities,
            max_depth = stats.max_depth,
            "sequencing session initialized"
        );
        Ok(())
    }

    /// End the session, closing any open attempts.
    ///
    /// Further requests are answered with [`ResponseReason::Terminated`].
    /// The last published state stays readable.
    ///
    /// # Errors
    ///
    /// Propagates a [`SequencingError`] from the handler.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub fn terminate(&self) -> Result<NavigationResponse, SnError> {
        Ok(match self.run(|handler| Ok(handler.terminate_all()))? {
            Ok(outcome) => NavigationResponse::from_outcome(outcome, None),
            Err(reason) => NavigationResponse::rejected(reason),
        })
    }

    // ── Requests ──

    /// Run one navigation request.
    ///
    /// Denials are successful calls with `success == false`. A request that
    /// ends the session closes it like [`terminate`](Self::terminate).
    ///
    /// # Errors
    ///
    /// [`SequencingError::ActivityNotFound`] for a `choice` naming an
    /// activity that is not in the tree.
    #[instrument(skip_all, fields(session_id = %self.id, %request))]
    pub fn process_navigation_request(
        &self,
        request: &NavigationRequest,
    ) -> Result<NavigationResponse, SnError> {
        let admitted = self.run(|handler| {
            let outcome = handler.process(request)?;
            Ok((outcome, handler.current_id().cloned()))
        })?;
        Ok(match admitted {
            Ok((outcome, current)) => NavigationResponse::from_outcome(outcome, current),
            Err(reason) => NavigationResponse::rejected(reason),
        })
    }

    /// Apply a value reported by the RTE and roll up from its activity.
    ///
    /// Returns whether the activity's state changed.
    ///
    /// # Errors
    ///
    /// [`SequencingError::ActivityNotFound`] for an unknown activity.
    #[instrument(skip_all, fields(session_id = %self.id, %activity_id))]
    pub fn update_tracking(
        &self,
        activity_id: &ActivityId,
        value: &TrackedValue,
    ) -> Result<Admitted<bool>, SnError> {
        self.run(|handler| handler.report_tracking(activity_id, value))
    }

    /// Roll up from `activity_id` toward the root.
    ///
    /// # Errors
    ///
    /// [`SequencingError::ActivityNotFound`] for an unknown activity.
    #[instrument(skip_all, fields(session_id = %self.id, %activity_id))]
    pub fn rollup(&self, activity_id: &ActivityId) -> Result<Admitted<RollupReport>, SnError> {
        self.run(|handler| handler.rollup(activity_id))
    }

    /// Run `f` against the handler if the session is free and running.
    ///
    /// Never waits: a call arriving while another holds the session is
    /// answered with [`ResponseReason::Busy`].
    fn run<T>(
        &self,
        f: impl FnOnce(&mut NavigationHandler) -> Result<T, SequencingError>,
    ) -> Result<Admitted<T>, SnError> {
        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("session busy");
            return Ok(Err(ResponseReason::Busy));
        };
        let Some(mut slot) = self.slot.try_lock() else {
            debug!("session busy initializing");
            return Ok(Err(ResponseReason::Busy));
        };
        let handler = match &mut *slot {
            SessionSlot::Uninitialized => return Ok(Err(ResponseReason::NotInitialized)),
            SessionSlot::Closed => return Ok(Err(ResponseReason::Terminated)),
            SessionSlot::Running(handler) => &mut **handler,
        };

        let value = f(handler)?;
        self.publish(handler);
        if handler.status() == SessionStatus::Terminated {
            *slot = SessionSlot::Closed;
            info!("sequencing session closed");
        }
        Ok(Ok(value))
    }

    // ── State ──

    /// The last published state, with the live pending flag.
    ///
    /// Does not wait for an in-flight request.
    pub fn get_sequencing_state(&self) -> SequencingState {
        let mut state = self.published.read().clone();
        state.sequencing_request_pending = self.in_flight.load(Ordering::Acquire);
        state
    }

    fn publish(&self, handler: &NavigationHandler) {
        *self.published.write() = SequencingState::capture(self.id.clone(), handler);
    }
}

fn build_options(settings: &SnSettings) -> BuildOptions {
    let defaults = &settings.control_mode;
    BuildOptions {
        max_depth: settings.tree.max_depth,
        max_activities: settings.tree.max_activities,
        control_defaults: ControlMode {
            choice: defaults.choice,
            choice_exit: defaults.choice_exit,
            flow: defaults.flow,
            forward_only: defaults.forward_only,
        },
    }
}

fn handler_options(settings: &SnSettings) -> HandlerOptions {
    HandlerOptions {
        rollup: RollupOptions {
            stop_when_unchanged: settings.rollup.stop_when_unchanged,
        },
        reset_progress_on_new_attempt: settings.session.reset_progress_on_new_attempt,
        sync_tracking_on_attempt_end: settings.session.sync_tracking_on_attempt_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sn_core::logging::capture_logs;
    use sn_core::TreeError;
    use sn_navigation::NavigationOutcome;
    use sn_tree::ActivitySpec;
    use tracing::Level;

    fn course() -> ActivityTreeSpec {
        ActivityTreeSpec::new(ActivitySpec::cluster(
            "course",
            [ActivitySpec::leaf("a"), ActivitySpec::leaf("b")],
        ))
    }

    fn session() -> SequencingSession {
        let session = SequencingSession::new(&SnSettings::default());
        session.initialize(&course()).unwrap();
        session
    }

    fn assert_send_sync<T: Send + Sync>() {}

    // ── Lifecycle ──

    #[test]
    fn session_is_send_and_sync() {
        assert_send_sync::<SequencingSession>();
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let settings = SnSettings::default();
        let a = SequencingSession::new(&settings);
        let b = SequencingSession::new(&settings);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.get_sequencing_state().session_id, *a.id());
    }

    #[test]
    fn initialize_publishes_not_started_state() {
        let session = session();
        assert!(session.is_initialized());
        let state = session.get_sequencing_state();
        assert_eq!(state.status, LifecycleStatus::NotStarted);
        assert_eq!(state.activities.len(), 3);
        assert!(state.availability.start);
    }

    #[test]
    fn initialize_twice_fails() {
        let session = session();
        let err = session.initialize(&course()).unwrap_err();
        assert_matches!(err, SnError::Sequencing(SequencingError::AlreadyInitialized));
    }

    #[test]
    fn structural_error_leaves_session_uninitialized() {
        let session = SequencingSession::new(&SnSettings::default());
        let spec = ActivityTreeSpec::new(ActivitySpec::new("root").with_child_ref("missing"));
        let err = session.initialize(&spec).unwrap_err();
        assert!(err.is_structural());
        assert_matches!(err, SnError::Tree(TreeError::DanglingReference { .. }));
        assert!(!session.is_initialized());
        session.initialize(&course()).unwrap();
    }

    #[test]
    fn settings_limits_apply_to_tree() {
        let mut settings = SnSettings::default();
        settings.tree.max_activities = 2;
        let session = SequencingSession::new(&settings);
        let err = session.initialize(&course()).unwrap_err();
        assert_matches!(err, SnError::Tree(TreeError::TooManyActivities { .. }));
    }

    #[test]
    fn settings_control_defaults_apply_to_tree() {
        let mut settings = SnSettings::default();
        settings.control_mode.flow = false;
        let session = SequencingSession::new(&settings);
        session.initialize(&course()).unwrap();
        let response = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        assert!(!response.success);
    }

    // ── Requests ──

    #[test]
    fn uninitialized_answers_not_initialized() {
        let session = SequencingSession::new(&SnSettings::default());
        let response = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        assert_eq!(response.reason, Some(ResponseReason::NotInitialized));
        assert_eq!(
            session.update_tracking(&"a".into(), &TrackedValue::ProgressMeasure(0.5)).unwrap(),
            Err(ResponseReason::NotInitialized)
        );
        assert_matches!(
            session.rollup(&"a".into()).unwrap(),
            Err(ResponseReason::NotInitialized)
        );
        assert_eq!(
            session.terminate().unwrap().reason,
            Some(ResponseReason::NotInitialized)
        );
    }

    #[test]
    fn start_and_continue() {
        let session = session();
        let response = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        assert!(response.success);
        assert_eq!(response.current_activity_id, Some("a".into()));

        let response = session
            .process_navigation_request(&NavigationRequest::Continue)
            .unwrap();
        assert_eq!(response.current_activity_id, Some("b".into()));
        assert_eq!(
            session.get_sequencing_state().current_activity_id,
            Some("b".into())
        );
    }

    #[test]
    fn denied_request_is_unsuccessful_response() {
        let session = session();
        let response = session
            .process_navigation_request(&NavigationRequest::Previous)
            .unwrap();
        assert!(!response.success);
        assert_matches!(response.reason, Some(ResponseReason::Denied { .. }));
    }

    #[test]
    fn unknown_choice_target_is_error() {
        let session = session();
        let err = session
            .process_navigation_request(&NavigationRequest::Choice {
                target_activity_id: "nope".into(),
            })
            .unwrap_err();
        assert_matches!(err, SnError::Sequencing(SequencingError::ActivityNotFound(id)) if id.as_str() == "nope");
        assert!(!session.get_sequencing_state().sequencing_request_pending);
    }

    #[test]
    fn tracking_update_publishes_state() {
        let session = session();
        let _ = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        let changed = session
            .update_tracking(&"a".into(), &TrackedValue::ProgressMeasure(0.25))
            .unwrap();
        assert_eq!(changed, Ok(true));
        let state = session.get_sequencing_state();
        assert_eq!(state.activity("a").unwrap().state.progress_measure, Some(0.25));
    }

    #[test]
    fn tracking_update_for_unknown_activity_fails() {
        let session = session();
        let err = session
            .update_tracking(&"ghost".into(), &TrackedValue::ProgressMeasure(0.1))
            .unwrap_err();
        assert_eq!(err.category(), "activity_not_found");
    }

    // ── Terminate ──

    #[test]
    fn terminate_closes_open_attempts() {
        let session = session();
        let _ = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        let response = session.terminate().unwrap();
        assert!(response.success);
        assert_eq!(response.outcome, Some(NavigationOutcome::Terminated));

        let state = session.get_sequencing_state();
        assert_eq!(state.status, LifecycleStatus::Terminated);
        assert!(state.activities.iter().all(|a| !a.is_active));
        assert!(state.availability.is_empty());
        assert!(!session.is_initialized());
    }

    #[test]
    fn exit_all_request_closes_the_session() {
        let session = session();
        let _ = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        let response = session
            .process_navigation_request(&NavigationRequest::ExitAll)
            .unwrap();
        assert_eq!(response.outcome, Some(NavigationOutcome::Terminated));
        assert!(!session.is_initialized());

        let response = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        assert_eq!(response.reason, Some(ResponseReason::Terminated));
        assert_eq!(
            session.update_tracking(&"a".into(), &TrackedValue::ProgressMeasure(0.5)).unwrap(),
            Err(ResponseReason::Terminated)
        );
        assert_eq!(
            session.terminate().unwrap().reason,
            Some(ResponseReason::Terminated)
        );
    }

    #[test]
    fn requests_after_terminate_are_rejected() {
        let session = session();
        let _ = session.terminate().unwrap();
        let response = session
            .process_navigation_request(&NavigationRequest::Start)
            .unwrap();
        assert_eq!(response.reason, Some(ResponseReason::Terminated));
        assert_eq!(
            session.terminate().unwrap().reason,
            Some(ResponseReason::Terminated)
        );
        assert_matches!(
            session.initialize(&course()),
            Err(SnError::Sequencing(SequencingError::AlreadyInitialized))
        );
    }

    // ── Logging ──

    #[test]
    fn initialize_logs_tree_summary() {
        let (logs, _guard) = capture_logs();
        let _session = session();
        let events = logs.at_level(Level::INFO);
        let event = events
            .iter()
            .find(|e| e.message.contains("sequencing session initialized"))
            .unwrap();
        assert_eq!(event.field("total_activities"), Some("3"));
    }

    #[test]
    fn rejected_tree_logs_category() {
        let (logs, _guard) = capture_logs();
        let session = SequencingSession::new(&SnSettings::default());
        let spec = ActivityTreeSpec::new(ActivitySpec::new("root").with_child_ref("missing"));
        let _ = session.initialize(&spec).unwrap_err();
        assert!(logs.has_event(Level::WARN, "activity tree rejected"));
    }
}
