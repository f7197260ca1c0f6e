//! Runtime configuration of the bridge.

use std::time::Duration;

use coach_settings::BridgeSettings;

/// Resolved bridge parameters.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Backend WebSocket endpoint.
    pub ws_url: String,
    /// Idle time after the last change before analysis fires.
    pub quiet_period: Duration,
    /// Upper bound on one handshake.
    pub connect_timeout: Duration,
    /// Reconnect delay after the first failure (doubles per failure).
    pub backoff_base: Duration,
    /// Cap on the reconnect delay.
    pub backoff_max: Duration,
    /// Capacity of the dispatch report channel.
    pub report_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&BridgeSettings::default())
    }
}

impl From<&BridgeSettings> for BridgeConfig {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            ws_url: settings.ws_url(),
            quiet_period: Duration::from_millis(settings.quiet_period_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            backoff_base: Duration::from_millis(settings.backoff.base_delay_ms),
            backoff_max: Duration::from_millis(settings.backoff.max_delay_ms),
            report_capacity: 256,
        }
    }
}
