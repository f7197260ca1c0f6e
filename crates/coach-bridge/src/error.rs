//! Bridge error types.
//!
//! Every variant is recoverable: the next transmission attempt starts over.

use std::time::Duration;

use thiserror::Error;

/// Transport-level failures observed while delivering a snapshot.
#[derive(Clone, Debug, Error)]
pub enum BridgeError {
    /// The handshake failed.
    #[error("connect to {url} failed: {reason}")]
    Connect {
        /// Target URL.
        url: String,
        /// Underlying transport error.
        reason: String,
    },
    /// The handshake did not complete in time.
    #[error("connect to {url} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Target URL.
        url: String,
        /// Configured limit.
        timeout: Duration,
    },
    /// Writing the frame failed.
    #[error("send failed: {0}")]
    Send(String),
    /// The connection was closed by either side.
    #[error("connection closed")]
    Closed,
    /// The message could not be serialized.
    #[error("serialize message: {0}")]
    Serialize(String),
    /// A previous attempt failed recently; this one was skipped.
    #[error("backing off for {remaining:?} after {failures} failed attempt(s)")]
    BackingOff {
        /// Time left before the next attempt is allowed.
        remaining: Duration,
        /// Consecutive failures so far.
        failures: u32,
    },
}

impl BridgeError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Send(_) => "send",
            Self::Closed => "closed",
            Self::Serialize(_) => "serialize",
            Self::BackingOff { .. } => "backing_off",
        }
    }

    /// Whether the failure came from the transport (as opposed to local state).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectTimeout { .. } | Self::Send(_) | Self::Closed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(BridgeError::Closed.error_kind(), "closed");
        assert_eq!(BridgeError::Send("eof".into()).error_kind(), "send");
        assert_eq!(
            BridgeError::BackingOff {
                remaining: Duration::from_millis(10),
                failures: 1
            }
            .error_kind(),
            "backing_off"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(
            BridgeError::Connect {
                url: "ws://x".into(),
                reason: "refused".into()
            }
            .is_transport()
        );
        assert!(!BridgeError::Serialize("bad".into()).is_transport());
        assert!(
            !BridgeError::BackingOff {
                remaining: Duration::ZERO,
                failures: 3
            }
            .is_transport()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = BridgeError::ConnectTimeout {
            url: "ws://localhost:12345/ws".into(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("ws://localhost:12345/ws"));
        assert!(err.to_string().contains("10s"));
    }
}
