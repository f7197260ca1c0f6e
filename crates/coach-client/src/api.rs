//! `reqwest` client for `GET /statements` and `GET /summary/{problemID}`.

use std::time::Duration;

use coach_core::{Statement, Summary};
use coach_settings::ApiSettings;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ClientError;

const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the coaching backend's read endpoints.
#[derive(Clone, Debug)]
pub struct CoachApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoachApiClient {
    /// Create a client rooted at `base_url` (trailing `/` ignored).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("coach/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    /// Create a client from the `api` settings section.
    pub fn from_settings(settings: &ApiSettings) -> Self {
        Self::new(&*settings.base_url, Duration::from_millis(settings.timeout_ms))
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All statements. A JSON `null` body is an empty list.
    pub async fn try_fetch_statements(&self) -> Result<Vec<Statement>, ClientError> {
        let statements: Option<Vec<Statement>> = self.get_json("/statements").await?;
        Ok(statements.unwrap_or_default())
    }

    /// All statements, or an empty list on any failure.
    pub async fn fetch_statements(&self) -> Vec<Statement> {
        match self.try_fetch_statements().await {
            Ok(statements) => {
                debug!(count = statements.len(), "statements loaded");
                statements
            }
            Err(err) => {
                warn!(error_kind = err.error_kind(), error = %err, "failed to load statements");
                Vec::new()
            }
        }
    }

    /// Summary for one problem.
    pub async fn fetch_summary(&self, problem_id: &str) -> Result<Summary, ClientError> {
        self.get_json(&format!("/summary/{problem_id}")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for CoachApiClient {
    fn default() -> Self {
        Self::from_settings(&ApiSettings::default())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
