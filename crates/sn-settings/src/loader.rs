//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SnSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::SnSettings;

/// Resolve the settings file path.
///
/// `$SN_SETTINGS_PATH` wins; otherwise `~/.scorm-sn/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = read_env_string("SN_SETTINGS_PATH") {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".scorm-sn").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SnSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that fail
/// [`SnSettings::validate`] yield an error.
pub fn load_settings_from_path(path: &Path) -> Result<SnSettings> {
    let defaults = serde_json::to_value(SnSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SnSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut SnSettings) {
    // ── Tree limits ─────────────────────────────────────────────────
    if let Some(v) = read_env_usize("SN_MAX_TREE_DEPTH", 1, 1024) {
        settings.tree.max_depth = v;
    }
    if let Some(v) = read_env_usize("SN_MAX_ACTIVITIES", 1, 1_000_000) {
        settings.tree.max_activities = v;
    }

    // ── Control-mode defaults ───────────────────────────────────────
    if let Some(v) = read_env_bool("SN_DEFAULT_FLOW") {
        settings.control_mode.flow = v;
    }
    if let Some(v) = read_env_bool("SN_DEFAULT_CHOICE") {
        settings.control_mode.choice = v;
    }
    if let Some(v) = read_env_bool("SN_DEFAULT_FORWARD_ONLY") {
        settings.control_mode.forward_only = v;
    }

    // ── Rollup / logging ────────────────────────────────────────────
    if let Some(v) = read_env_bool("SN_ROLLUP_STOP_WHEN_UNCHANGED") {
        settings.rollup.stop_when_unchanged = v;
    }
    if let Some(v) = read_env_string("SN_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("SN_LOG_FORMAT") {
        match v.parse() {
            Ok(format) => settings.logging.format = format,
            Err(e) => tracing::warn!(key = "SN_LOG_FORMAT", value = %v, error = %e, "ignoring env var"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
