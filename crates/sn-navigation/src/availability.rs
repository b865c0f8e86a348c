//! Which navigation requests a UI should offer.

use serde::{Deserialize, Serialize};
use sn_core::ActivityId;

use crate::choice::check_choice;
use crate::handler::NavigationHandler;
use crate::request::NavigationRequestKind;
use crate::traversal::{Direction, FlowTraversal, Traversal};

/// Requests that would plausibly succeed right now.
///
/// Computed without running the departure sequence, so post-condition
/// rules of the current activity are not taken into account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct NavigationAvailability {
    /// `start`.
    pub start: bool,
    /// `resumeAll`.
    pub resume_all: bool,
    /// `continue`.
    #[serde(rename = "continue")]
    pub continue_: bool,
    /// `previous`.
    pub previous: bool,
    /// Activities a `choice` request may target, in flow order.
    pub choice_targets: Vec<ActivityId>,
    /// `unqualifiedExit`.
    pub unqualified_exit: bool,
    /// `suspendAll`.
    pub suspend_all: bool,
    /// `exitAll`.
    pub exit_all: bool,
}

impl NavigationAvailability {
    /// Availability for the handler's current state.
    pub fn of(handler: &NavigationHandler) -> Self {
        let status = handler.status();
        let valid = |kind| NavigationHandler::is_valid_for_status(kind, status);
        let tree = handler.tree();
        let flow = FlowTraversal::new(tree);
        let current = handler.current();

        let flows = |direction| {
            current.is_some_and(|idx| matches!(flow.next_from(idx, direction), Traversal::Found(_)))
        };

        let choice_targets = if valid(NavigationRequestKind::Choice) {
            tree.preorder()
                .into_iter()
                .filter(|&idx| check_choice(tree, current, idx).is_ok())
                .map(|idx| tree.id(idx).clone())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            start: valid(NavigationRequestKind::Start)
                && matches!(flow.first_from_root(), Traversal::Found(_)),
            resume_all: valid(NavigationRequestKind::ResumeAll) && handler.suspended().is_some(),
            continue_: valid(NavigationRequestKind::Continue) && flows(Direction::Forward),
            previous: valid(NavigationRequestKind::Previous) && flows(Direction::Backward),
            choice_targets,
            unqualified_exit: valid(NavigationRequestKind::UnqualifiedExit)
                && current.is_some_and(|idx| tree.get(idx).is_active),
            suspend_all: valid(NavigationRequestKind::SuspendAll) && current.is_some(),
            exit_all: valid(NavigationRequestKind::ExitAll),
        }
    }

    /// Nothing is available.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOptions;
    use crate::request::NavigationRequest;
    use crate::status::SessionStatus;
    use sn_tree::{ActivitySpec, TreeBuilder};

    fn handler() -> NavigationHandler {
        let tree = TreeBuilder::default()
            .build_root(ActivitySpec::cluster(
                "root",
                [
                    ActivitySpec::leaf("a"),
                    ActivitySpec::leaf("b"),
                    ActivitySpec::leaf("hidden").hidden(),
                ],
            ))
            .unwrap();
        NavigationHandler::new(tree, HandlerOptions::default())
    }

    fn ids(targets: &[ActivityId]) -> Vec<&str> {
        targets.iter().map(ActivityId::as_str).collect()
    }

    #[test]
    fn before_start() {
        let availability = handler().availability();
        assert!(availability.start);
        assert!(!availability.continue_);
        assert!(!availability.exit_all);
        assert_eq!(ids(&availability.choice_targets), ["root", "a", "b"]);
    }

    #[test]
    fn on_first_leaf() {
        let mut h = handler();
        let _ = h.process(&NavigationRequest::Start).unwrap();
        let availability = h.availability();
        assert!(!availability.start);
        assert!(availability.continue_);
        assert!(!availability.previous);
        assert!(availability.suspend_all);
        assert!(availability.unqualified_exit);
        assert!(availability.exit_all);
    }

    #[test]
    fn suspended_offers_resume_and_exit() {
        let mut h = handler();
        let _ = h.process(&NavigationRequest::Start).unwrap();
        let _ = h.process(&NavigationRequest::SuspendAll).unwrap();
        let availability = h.availability();
        assert!(availability.resume_all);
        assert!(availability.exit_all);
        assert!(availability.choice_targets.is_empty());
        assert!(!availability.continue_);
    }

    #[test]
    fn terminated_offers_nothing() {
        let mut h = handler();
        let _ = h.process(&NavigationRequest::Start).unwrap();
        let _ = h.process(&NavigationRequest::ExitAll).unwrap();
        assert!(h.availability().is_empty());
        assert_eq!(h.status(), SessionStatus::Terminated);
    }

    #[test]
    fn json_uses_request_names() {
        let json = serde_json::to_value(handler().availability()).unwrap();
        assert_eq!(json["start"], true);
        assert_eq!(json["continue"], false);
        assert_eq!(json["choiceTargets"], serde_json::json!(["root", "a", "b"]));
    }
}
