//! Client error types.

use thiserror::Error;

/// Failures on the statement and summary read paths.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the body could not be read.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The body was not the expected JSON.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }
}
