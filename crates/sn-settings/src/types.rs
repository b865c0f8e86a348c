//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their default value.

use serde::{Deserialize, Serialize};
use sn_core::logging::LogFormat;

use crate::errors::{Result, SettingsError};

/// Root settings type for the sequencing engine.
///
/// ```json
/// {
///   "tree": { "maxDepth": 16 },
///   "controlMode": { "flow": false },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnSettings {
    /// Settings schema version.
    pub version: String,
    /// Structural limits applied when building activity trees.
    pub tree: TreeSettings,
    /// Control-mode values used where neither an activity nor any ancestor sets one.
    pub control_mode: ControlModeDefaults,
    /// Rollup behavior.
    pub rollup: RollupSettings,
    /// Attempt and tracking behavior of a session.
    pub session: SessionSettings,
    /// Logging configuration for hosts that install a subscriber.
    pub logging: LoggingSettings,
}

impl Default for SnSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            tree: TreeSettings::default(),
            control_mode: ControlModeDefaults::default(),
            rollup: RollupSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SnSettings {
    /// Reject values that would make every tree unbuildable.
    pub fn validate(&self) -> Result<()> {
        if self.tree.max_depth == 0 {
            return Err(SettingsError::InvalidValue(
                "tree.maxDepth must be at least 1".to_string(),
            ));
        }
        if self.tree.max_activities == 0 {
            return Err(SettingsError::InvalidValue(
                "tree.maxActivities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Structural limits for activity trees.
///
/// Both limits guard against pathological or malicious structures; no real
/// course comes close to them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeSettings {
    /// Maximum depth of any activity (root = 0).
    pub max_depth: usize,
    /// Maximum number of activities in one tree.
    pub max_activities: usize,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_activities: 10_000,
        }
    }
}

/// Fallback control-mode flags for the root of the inheritance chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlModeDefaults {
    /// Learner may pick activities directly.
    pub choice: bool,
    /// Learner may leave an active cluster by choosing outside it.
    pub choice_exit: bool,
    /// Continue/previous navigation between siblings.
    pub flow: bool,
    /// Backward navigation is forbidden.
    pub forward_only: bool,
}

impl Default for ControlModeDefaults {
    fn default() -> Self {
        Self {
            choice: true,
            choice_exit: true,
            flow: true,
            forward_only: false,
        }
    }
}

/// Rollup behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollupSettings {
    /// Stop walking toward the root once an ancestor's status is unchanged.
    pub stop_when_unchanged: bool,
}

impl Default for RollupSettings {
    fn default() -> Self {
        Self {
            stop_when_unchanged: true,
        }
    }
}

/// Attempt and tracking behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Clear completion status and progress measure when an activity that was
    /// attempted before begins a new attempt.
    pub reset_progress_on_new_attempt: bool,
    /// Pull tracked values from the tracking adapter when an attempt ends.
    pub sync_tracking_on_attempt_end: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reset_progress_on_new_attempt: false,
            sync_tracking_on_attempt_end: true,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive passed to the subscriber (`RUST_LOG` syntax).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(SnSettings::default()).unwrap();
        assert_eq!(json["tree"]["maxDepth"], 32);
        assert_eq!(json["controlMode"]["forwardOnly"], false);
        assert_eq!(json["session"]["syncTrackingOnAttemptEnd"], true);
        assert_eq!(json["logging"]["format"], "compact");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: SnSettings =
            serde_json::from_str(r#"{"controlMode": {"flow": false}}"#).unwrap();
        assert!(!settings.control_mode.flow);
        assert!(settings.control_mode.choice);
        assert_eq!(settings.tree.max_depth, 32);
    }

    #[test]
    fn validate_rejects_zero_depth() {
        let mut settings = SnSettings::default();
        settings.tree.max_depth = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("maxDepth"));
    }

    #[test]
    fn validate_rejects_zero_size() {
        let mut settings = SnSettings::default();
        settings.tree.max_activities = 0;
        assert!(settings.validate().is_err());
    }
}
