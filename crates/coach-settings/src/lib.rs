//! # coach-settings
//!
//! Configuration with layered sources for the coach bridge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CoachSettings::default()`]
//! 2. **User file**: `~/.coach/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COACH_*` overrides (highest priority)
//!
//! Command-line flags of the `coach` binary are applied on top by the caller.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, merge_into, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<CoachSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.coach/settings.json` with env var
/// overrides, falling back to compiled defaults if loading fails.
pub fn get_settings() -> &'static CoachSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CoachSettings) -> std::result::Result<(), CoachSettings> {
    SETTINGS.set(settings)
}
