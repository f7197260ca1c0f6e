//! Snapshot value and the JSON shapes exchanged with the coaching backend.

use serde::{Deserialize, Serialize};

use crate::problem::ProblemId;

/// Immutable view of a document at one settled edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Problem tag found in the document, if any.
    pub problem_id: Option<ProblemId>,
    /// Full document text at extraction time.
    pub code: String,
    /// Non-empty trimmed comment bodies joined by `\n`, in document order.
    pub thoughts: String,
}

impl Snapshot {
    /// Build the outbound message. `None` when the snapshot carries no problem tag.
    pub fn to_message(&self) -> Option<EditorMessage> {
        let problem_id = self.problem_id.clone()?;
        Some(EditorMessage {
            problem_id,
            code: self.code.clone(),
            thoughts: self.thoughts.clone(),
        })
    }
}

/// One text frame sent to `/ws` per settled, problem-tagged edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorMessage {
    /// Problem identifier.
    pub problem_id: ProblemId,
    /// Full document text.
    pub code: String,
    /// Newline-joined thoughts.
    pub thoughts: String,
}

impl EditorMessage {
    /// Serialize to the single-line JSON text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Entry of `GET /statements`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Problem identifier, as stored by the backend.
    #[serde(rename = "problemID")]
    pub problem_id: String,
    /// Statement body (backend-provided markup).
    pub statement: String,
}

/// Body of `GET /summary/{problemID}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Problem identifier, as stored by the backend.
    #[serde(rename = "problemID", default)]
    pub problem_id: String,
    /// Aggregated feedback.
    #[serde(default)]
    pub feedback: String,
    /// Proof notes.
    #[serde(default)]
    pub proof: String,
    /// Suggested meta-cognition for the problem.
    #[serde(default)]
    pub optimal_meta_cognition: String,
}
