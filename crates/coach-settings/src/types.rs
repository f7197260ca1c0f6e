//! Settings type definitions.
//!
//! All types use camelCase JSON keys and `#[serde(default)]`, so a partial
//! settings file only needs the keys it changes.

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoachSettings {
    /// Live streaming bridge (`/ws`).
    pub bridge: BridgeSettings,
    /// Read endpoints (`/statements`, `/summary/{id}`).
    pub api: ApiSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Streaming bridge settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Backend host.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// WebSocket path.
    pub path: String,
    /// Idle time after the last change before a document is analysed.
    pub quiet_period_ms: u64,
    /// Upper bound on a single handshake.
    pub connect_timeout_ms: u64,
    /// Delay before reconnecting after a failure.
    pub backoff: BackoffSettings,
}

impl BridgeSettings {
    /// `ws://{host}:{port}{path}`.
    pub fn ws_url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.host, self.port, path)
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 12345,
            path: "/ws".to_string(),
            quiet_period_ms: 2000,
            connect_timeout_ms: 10_000,
            backoff: BackoffSettings::default(),
        }
    }
}

/// Reconnect backoff. A zero base delay retries on the very next send.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffSettings {
    /// Delay after the first failure in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

/// HTTP read API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL for `/statements` and `/summary/{id}`.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:12345".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output on stderr.
    #[default]
    Compact,
    /// One JSON object per event on stderr.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
