//! Statement list with lazily fetched, cached summaries.
//!
//! One entry is expanded at a time. Expanding an entry without a cached
//! summary fetches it; only successful fetches are cached, so a failed
//! lookup is retried the next time the entry is expanded.

use std::collections::HashMap;
use std::fmt::Write as _;

use coach_core::{Statement, Summary};
use tracing::{debug, warn};

use crate::api::CoachApiClient;

/// What the panel under one statement shows.
#[derive(Debug, PartialEq, Eq)]
pub enum Panel<'a> {
    /// The entry is not expanded.
    Collapsed,
    /// Expanded, but no summary is available.
    Empty,
    /// Expanded with a cached summary.
    Summary(&'a Summary),
}

/// Model of the statement browsing surface.
pub struct StatementBrowser {
    client: CoachApiClient,
    statements: Option<Vec<Statement>>,
    summaries: HashMap<String, Summary>,
    expanded: Option<String>,
}

impl StatementBrowser {
    /// Create an empty browser. Nothing is fetched until [`load`](Self::load).
    pub fn new(client: CoachApiClient) -> Self {
        Self {
            client,
            statements: None,
            summaries: HashMap::new(),
            expanded: None,
        }
    }

    /// Fetch the statement list on first call; later calls return the same list.
    pub async fn load(&mut self) -> &[Statement] {
        if self.statements.is_none() {
            self.statements = Some(self.client.fetch_statements().await);
        }
        self.statements.as_deref().unwrap_or_default()
    }

    /// Loaded statements (empty before [`load`](Self::load)).
    pub fn statements(&self) -> &[Statement] {
        self.statements.as_deref().unwrap_or_default()
    }

    /// Currently expanded problem, if any.
    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    /// Cached summary for a problem.
    pub fn summary(&self, problem_id: &str) -> Option<&Summary> {
        self.summaries.get(problem_id)
    }

    /// Collapse `problem_id` if it is expanded, otherwise expand it and fetch
    /// its summary when none is cached. Returns whether it is now expanded.
    pub async fn toggle(&mut self, problem_id: &str) -> bool {
        if self.expanded.as_deref() == Some(problem_id) {
            self.expanded = None;
            return false;
        }
        self.expanded = Some(problem_id.to_string());

        if !self.summaries.contains_key(problem_id) {
            match self.client.fetch_summary(problem_id).await {
                Ok(summary) => {
                    debug!(%problem_id, "summary cached");
                    let _ = self.summaries.insert(problem_id.to_string(), summary);
                }
                Err(err) => {
                    warn!(%problem_id, error_kind = err.error_kind(), error = %err, "failed to load summary");
                }
            }
        }
        true
    }

    /// Panel state for one entry.
    pub fn panel(&self, problem_id: &str) -> Panel<'_> {
        if self.expanded.as_deref() != Some(problem_id) {
            return Panel::Collapsed;
        }
        self.summaries
            .get(problem_id)
            .map_or(Panel::Empty, Panel::Summary)
    }

    /// Plain-text listing of all statements with the expanded panel inline.
    pub fn render(&self) -> String {
        let mut out = String::from("Problem Statements\n");
        for statement in self.statements() {
            let marker = if self.expanded.as_deref() == Some(statement.problem_id.as_str()) {
                '-'
            } else {
                '+'
            };
            let _ = writeln!(out, "{marker} [{}] {}", statement.problem_id, statement.statement);
            if let Panel::Summary(summary) = self.panel(&statement.problem_id) {
                let _ = writeln!(out, "    Feedback: {}", summary.feedback);
                let _ = writeln!(out, "    Proof: {}", summary.proof);
                let _ = writeln!(out, "    Optimal MetaCognition: {}", summary.optimal_meta_cognition);
            }
        }
        out
    }
}
