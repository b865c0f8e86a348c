//! Simulator scripts.
//!
//! One step per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! start
//! set:intro:completion=completed
//! continue
//! choice:quiz
//! rollup:module-1
//! state
//! terminate
//! ```

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use sn_core::ActivityId;
use sn_navigation::NavigationRequest;
use sn_tree::{TrackedField, TrackedValue};

/// One scripted action.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// A navigation request.
    Navigate(NavigationRequest),
    /// The RTE reports a tracked value.
    Track {
        /// Activity the value belongs to.
        activity_id: ActivityId,
        /// The value.
        value: TrackedValue,
    },
    /// Explicit rollup from an activity.
    Rollup(ActivityId),
    /// Print the current sequencing state.
    State,
    /// Terminate the session.
    Terminate,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate(request) => write!(f, "{request}"),
            Self::Track { activity_id, value } => write!(f, "set:{activity_id}:{value:?}"),
            Self::Rollup(activity_id) => write!(f, "rollup:{activity_id}"),
            Self::State => f.write_str("state"),
            Self::Terminate => f.write_str("terminate"),
        }
    }
}

impl Step {
    /// Parse one non-empty line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        match line {
            "state" => return Ok(Self::State),
            "terminate" => return Ok(Self::Terminate),
            _ => {}
        }

        if let Some(rest) = line.strip_prefix("set:") {
            let (activity_id, assignment) = rest
                .split_once(':')
                .ok_or_else(|| anyhow!("expected set:<activity>:<field>=<value>"))?;
            let (field, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("expected <field>=<value> after {activity_id}"))?;
            let field: TrackedField = field.trim().parse().map_err(|e: String| anyhow!(e))?;
            let value = TrackedValue::parse(field, value.trim()).map_err(|e| anyhow!(e))?;
            return Ok(Self::Track {
                activity_id: activity_id.trim().into(),
                value,
            });
        }

        if let Some(activity_id) = line.strip_prefix("rollup:") {
            let activity_id = activity_id.trim();
            if activity_id.is_empty() {
                bail!("rollup needs an activity");
            }
            return Ok(Self::Rollup(activity_id.into()));
        }

        line.parse::<NavigationRequest>()
            .map(Self::Navigate)
            .map_err(|e| anyhow!(e))
    }
}

/// Parse a whole script.
pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    text.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| Step::parse(line).with_context(|| format!("line {n}: {line}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sn_tree::CompletionStatus;

    #[test]
    fn parses_navigation_requests() {
        assert_eq!(
            Step::parse("continue").unwrap(),
            Step::Navigate(NavigationRequest::Continue)
        );
        assert_eq!(
            Step::parse("choice:m2").unwrap(),
            Step::Navigate(NavigationRequest::choice("m2"))
        );
    }

    #[test]
    fn parses_tracking_updates() {
        let step = Step::parse("set:intro:completion=completed").unwrap();
        assert_eq!(
            step,
            Step::Track {
                activity_id: "intro".into(),
                value: TrackedValue::CompletionStatus(CompletionStatus::Completed),
            }
        );
        assert_matches!(
            Step::parse("set:quiz:scoreScaled=0.8").unwrap(),
            Step::Track { value: TrackedValue::ScoreScaled(s), .. } if (s - 0.8).abs() < f64::EPSILON
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Step::parse("set:intro").is_err());
        assert!(Step::parse("set:intro:mood=happy").is_err());
        assert!(Step::parse("set:intro:progress=lots").is_err());
        assert!(Step::parse("rollup:").is_err());
        assert!(Step::parse("jump").is_err());
    }

    #[test]
    fn script_skips_comments_and_reports_line() {
        let steps = parse_script("# warm up\nstart\n\n  continue\nstate\n").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], Step::State);

        let err = parse_script("start\nbogus\n").unwrap_err();
        assert!(format!("{err:#}").starts_with("line 2: bogus"));
    }
}
