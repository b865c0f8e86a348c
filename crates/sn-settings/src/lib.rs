//! # sn-settings
//!
//! Configuration for the sequencing engine, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`SnSettings::default()`]
//! 2. **Settings file**: `~/.scorm-sn/settings.json` or `$SN_SETTINGS_PATH`
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `SN_*` overrides (highest priority)
//!
//! Library users normally build [`SnSettings`] directly and hand it to a
//! session; the global accessor exists for the simulator binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<SnSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from disk with env var overrides. If
/// loading fails, returns compiled defaults.
pub fn get_settings() -> &'static SnSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            SnSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: SnSettings) -> std::result::Result<(), SnSettings> {
    SETTINGS.set(settings)
}
