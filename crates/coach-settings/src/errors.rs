//! Settings error types.

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON, or does not fit the schema.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is outside what the bridge can run with.
    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

/// Settings result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;
