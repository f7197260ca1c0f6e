//! Layered loading: compiled defaults, then `~/.coach/settings.json`, then
//! `COACH_*` environment variables, then validation.
//!
//! The file layer is merged as JSON before deserializing, so a file only needs
//! the keys it changes. Objects merge key by key, `null` leaves the default in
//! place, and any other value (arrays included) replaces it.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{CoachSettings, LogFormat};

/// `~/.coach/settings.json`, or under `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".coach").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<CoachSettings> {
    load_settings_from_path(&settings_path())
}

/// All layers for the file at `path`.
///
/// A missing file means defaults; unreadable or malformed JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CoachSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<CoachSettings> {
    let mut merged = serde_json::to_value(CoachSettings::default())?;
    if path.exists() {
        debug!(path = %path.display(), "reading settings file");
        let overlay: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        merge_into(&mut merged, overlay);
    } else {
        debug!(path = %path.display(), "no settings file, using defaults");
    }
    Ok(serde_json::from_value(merged)?)
}

/// Return `base` with `overlay` merged over it.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

/// Merge `overlay` into `base` in place.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Reject settings the bridge cannot run with.
pub fn validate(settings: &CoachSettings) -> Result<()> {
    if settings.bridge.quiet_period_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "bridge.quietPeriodMs must be positive".into(),
        ));
    }
    if settings.bridge.host.trim().is_empty() {
        return Err(SettingsError::InvalidValue("bridge.host is empty".into()));
    }
    if settings.bridge.backoff.max_delay_ms < settings.bridge.backoff.base_delay_ms {
        return Err(SettingsError::InvalidValue(
            "bridge.backoff.maxDelayMs is below baseDelayMs".into(),
        ));
    }
    Ok(())
}

/// Apply `COACH_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut CoachSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_overrides_from<F>(settings: &mut CoachSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("COACH_HOST") {
        settings.bridge.host = v;
    }
    if let Some(v) = read("COACH_PORT") {
        match parse_u16_range(&v, 1, 65535) {
            Some(port) => settings.bridge.port = port,
            None => warn_invalid("COACH_PORT", &v),
        }
    }
    if let Some(v) = read("COACH_QUIET_PERIOD_MS") {
        match parse_u64_range(&v, 50, 600_000) {
            Some(ms) => settings.bridge.quiet_period_ms = ms,
            None => warn_invalid("COACH_QUIET_PERIOD_MS", &v),
        }
    }
    if let Some(v) = read("COACH_CONNECT_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(ms) => settings.bridge.connect_timeout_ms = ms,
            None => warn_invalid("COACH_CONNECT_TIMEOUT_MS", &v),
        }
    }
    if let Some(v) = read("COACH_API_URL") {
        settings.api.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = read("COACH_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("COACH_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn_invalid("COACH_LOG_FORMAT", &v),
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "ignoring out-of-range or malformed environment override");
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// `val` as a `u16` in `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    val.trim().parse().ok().filter(|n| (min..=max).contains(n))
}

/// `val` as a `u64` in `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    val.trim().parse().ok().filter(|n| (min..=max).contains(n))
}

/// Parse `compact` / `json` (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"bridge": {"port": 12345, "host": "localhost"}});
        let source = serde_json::json!({"bridge": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["bridge"]["port"], 9090);
        assert_eq!(merged["bridge"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_in_place_adds_new_keys() {
        let mut base = serde_json::json!({"api": {"timeoutMs": 10}});
        merge_into(&mut base, serde_json::json!({"api": {"baseUrl": "http://x"}}));
        assert_eq!(base["api"]["timeoutMs"], 10);
        assert_eq!(base["api"]["baseUrl"], "http://x");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.bridge.port, 12345);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"bridge": {"host": "coach.local", "backoff": {"baseDelayMs": 0}}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.bridge.host, "coach.local");
        assert_eq!(settings.bridge.backoff.base_delay_ms, 0);
        assert_eq!(settings.bridge.backoff.max_delay_ms, 30_000);
        assert_eq!(settings.bridge.port, 12345);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn zero_quiet_period_rejected() {
        let mut settings = CoachSettings::default();
        settings.bridge.quiet_period_ms = 0;
        assert!(matches!(validate(&settings), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn inverted_backoff_rejected() {
        let mut settings = CoachSettings::default();
        settings.bridge.backoff.base_delay_ms = 60_000;
        assert!(validate(&settings).is_err());
        assert!(validate(&CoachSettings::default()).is_ok());
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = CoachSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("COACH_HOST", "10.1.1.1"),
                ("COACH_PORT", "4000"),
                ("COACH_QUIET_PERIOD_MS", "750"),
                ("COACH_API_URL", "http://10.1.1.1:4000/"),
                ("COACH_LOG_FORMAT", "JSON"),
            ]),
        );
        assert_eq!(settings.bridge.ws_url(), "ws://10.1.1.1:4000/ws");
        assert_eq!(settings.bridge.quiet_period_ms, 750);
        assert_eq!(settings.api.base_url, "http://10.1.1.1:4000");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = CoachSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("COACH_PORT", "0"),
                ("COACH_QUIET_PERIOD_MS", "fast"),
                ("COACH_LOG_FORMAT", "xml"),
                ("COACH_HOST", ""),
            ]),
        );
        assert_eq!(settings.bridge.port, 12345);
        assert_eq!(settings.bridge.quiet_period_ms, 2000);
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert_eq!(settings.bridge.host, "localhost");
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("9090", 1, 65535), Some(9090));
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u64_range("49", 50, 600_000), None);
        assert_eq!(parse_u64_range("abc", 50, 600_000), None);
    }
}
