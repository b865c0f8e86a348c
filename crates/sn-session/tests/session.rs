//! Facade behavior across threads and whole-course walkthroughs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use assert_matches::assert_matches;
use sn_core::ActivityId;
use sn_navigation::{NavigationOutcome, NavigationRequest};
use sn_session::{LifecycleStatus, ResponseReason, SequencingSession};
use sn_settings::SnSettings;
use sn_tree::{
    ActivitySpec, ActivityTreeSpec, CompletionStatus, PostConditionAction, RuleCondition,
    RuleConditionKind, SequencingRule, SuccessStatus, TrackedField, TrackedValue, TrackingAdapter,
};

/// Parks the first `set_tracked_value` call after being armed until released.
struct GateTracking {
    armed: Arc<AtomicBool>,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl TrackingAdapter for GateTracking {
    fn get_tracked_value(&self, _activity_id: &ActivityId, _field: TrackedField) -> Option<TrackedValue> {
        None
    }

    fn set_tracked_value(&mut self, _activity_id: &ActivityId, _value: TrackedValue) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.send(()).unwrap();
            self.release.recv().unwrap();
        }
    }
}

fn two_leaves() -> ActivityTreeSpec {
    ActivityTreeSpec::new(ActivitySpec::cluster(
        "course",
        [ActivitySpec::leaf("a"), ActivitySpec::leaf("b")],
    ))
}

// ── Concurrency ──

#[test]
fn second_request_while_one_is_in_flight_is_busy() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let armed = Arc::new(AtomicBool::new(true));
    let session = SequencingSession::new(&SnSettings::default());
    session
        .initialize_with_tracking(
            &two_leaves(),
            Box::new(GateTracking {
                armed: Arc::clone(&armed),
                entered: entered_tx,
                release: release_rx,
            }),
        )
        .unwrap();

    std::thread::scope(|s| {
        let first = s.spawn(|| {
            session
                .process_navigation_request(&NavigationRequest::Start)
                .unwrap()
        });

        entered_rx.recv().unwrap();
        let busy = session
            .process_navigation_request(&NavigationRequest::Continue)
            .unwrap();
        assert_eq!(busy.reason, Some(ResponseReason::Busy));
        assert!(!busy.success);

        let state = session.get_sequencing_state();
        assert!(state.sequencing_request_pending);
        assert_eq!(state.status, LifecycleStatus::NotStarted);

        release_tx.send(()).unwrap();
        let first = first.join().unwrap();
        assert!(first.success);
        assert_eq!(first.current_activity_id, Some("a".into()));
    });

    let state = session.get_sequencing_state();
    assert!(!state.sequencing_request_pending);
    assert_eq!(state.status, LifecycleStatus::Active);

    let next = session
        .process_navigation_request(&NavigationRequest::Continue)
        .unwrap();
    assert_eq!(next.current_activity_id, Some("b".into()));
}

#[test]
fn tracking_update_while_request_in_flight_is_busy() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let session = Arc::new(SequencingSession::new(&SnSettings::default()));
    session
        .initialize_with_tracking(
            &two_leaves(),
            Box::new(GateTracking {
                armed: Arc::new(AtomicBool::new(true)),
                entered: entered_tx,
                release: release_rx,
            }),
        )
        .unwrap();

    let first = {
        let session = Arc::clone(&session);
        std::thread::spawn(move || {
            session
                .process_navigation_request(&NavigationRequest::Start)
                .unwrap()
        })
    };

    entered_rx.recv().unwrap();
    let progress = TrackedValue::ProgressMeasure(0.4);
    assert_eq!(
        session.update_tracking(&"a".into(), &progress).unwrap(),
        Err(ResponseReason::Busy)
    );
    assert_matches!(session.rollup(&"a".into()).unwrap(), Err(ResponseReason::Busy));
    assert_eq!(
        session.terminate().unwrap().reason,
        Some(ResponseReason::Busy)
    );

    release_tx.send(()).unwrap();
    assert!(first.join().unwrap().success);
    assert_eq!(session.update_tracking(&"a".into(), &progress).unwrap(), Ok(true));
    let state = session.get_sequencing_state();
    assert_eq!(state.activity("a").unwrap().state.progress_measure, Some(0.4));
    assert_eq!(state.status, LifecycleStatus::Active);
}

// ── Walkthroughs ──

#[test]
fn quiz_retried_until_passed() {
    let retry_until_passed = SequencingRule::all(
        vec![RuleCondition::new(RuleConditionKind::Satisfied).negated()],
        PostConditionAction::Retry,
    );
    let spec = ActivityTreeSpec::new(ActivitySpec::cluster(
        "course",
        [
            ActivitySpec::leaf("lesson").excluded_from_rollup(),
            ActivitySpec::leaf("quiz").with_post_rule(retry_until_passed),
        ],
    ));
    let session = SequencingSession::new(&SnSettings::default());
    session.initialize(&spec).unwrap();

    let _ = session
        .process_navigation_request(&NavigationRequest::Start)
        .unwrap();
    let _ = session
        .update_tracking(&"lesson".into(), &TrackedValue::CompletionStatus(CompletionStatus::Completed))
        .unwrap();
    let response = session
        .process_navigation_request(&NavigationRequest::Continue)
        .unwrap();
    assert_eq!(response.current_activity_id, Some("quiz".into()));

    let _ = session
        .update_tracking(&"quiz".into(), &TrackedValue::SuccessStatus(SuccessStatus::Failed))
        .unwrap();
    let response = session
        .process_navigation_request(&NavigationRequest::Continue)
        .unwrap();
    assert_eq!(response.current_activity_id, Some("quiz".into()));
    assert_eq!(session.get_sequencing_state().activity("quiz").unwrap().state.attempt_count, 2);

    let _ = session
        .update_tracking(&"quiz".into(), &TrackedValue::SuccessStatus(SuccessStatus::Passed))
        .unwrap();
    let response = session
        .process_navigation_request(&NavigationRequest::Continue)
        .unwrap();
    assert!(!response.success);
    assert_matches!(response.reason, Some(ResponseReason::Denied { .. }));

    let response = session.terminate().unwrap();
    assert_eq!(response.outcome, Some(NavigationOutcome::Terminated));
    let state = session.get_sequencing_state();
    assert_eq!(state.status, LifecycleStatus::Terminated);
    assert_eq!(
        state.activity("course").unwrap().state.success_status,
        SuccessStatus::Passed
    );
}

#[test]
fn suspend_and_resume_through_facade() {
    let session = SequencingSession::new(&SnSettings::default());
    session.initialize(&two_leaves()).unwrap();
    let _ = session
        .process_navigation_request(&NavigationRequest::Start)
        .unwrap();
    let _ = session
        .process_navigation_request(&NavigationRequest::Continue)
        .unwrap();

    let response = session
        .process_navigation_request(&NavigationRequest::SuspendAll)
        .unwrap();
    assert!(response.success);
    let state = session.get_sequencing_state();
    assert_eq!(state.status, LifecycleStatus::Suspended);
    assert_eq!(state.suspended_activity_id, Some("b".into()));
    assert!(state.availability.resume_all);

    let response = session
        .process_navigation_request(&NavigationRequest::ResumeAll)
        .unwrap();
    assert_eq!(response.current_activity_id, Some("b".into()));
    assert_eq!(session.get_sequencing_state().status, LifecycleStatus::Active);
}

#[test]
fn response_json_shape() {
    let session = SequencingSession::new(&SnSettings::default());
    session.initialize(&two_leaves()).unwrap();
    let response = session
        .process_navigation_request(&NavigationRequest::Start)
        .unwrap();
    insta::assert_json_snapshot!(response, @r#"
    {
      "success": true,
      "currentActivityId": "a",
      "outcome": {
        "outcome": "delivered",
        "activityId": "a"
      }
    }
    "#);

    let response = session
        .process_navigation_request(&NavigationRequest::Previous)
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"]["kind"], "denied");
    assert_eq!(json["currentActivityId"], "a");
}
