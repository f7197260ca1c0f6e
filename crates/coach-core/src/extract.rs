//! Signal extraction: document text → [`Snapshot`].
//!
//! Pure and synchronous. Malformed or missing comments only produce empty or
//! absent fields; extraction never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::messages::Snapshot;
use crate::problem::ProblemId;

/// `// problem: <id>` anywhere in the text. Whitespace is horizontal only, so
/// a tag never spans lines. Case folding is ASCII-only: `ſ` or `K` (Kelvin)
/// must not stand in for a letter.
static PROBLEM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)//[ \t]*problem:[ \t]*([0-9]+[A-Z][0-9]?)").unwrap());

/// `problem: <id>` inside an already isolated comment body.
static TAG_IN_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)problem:[ \t]*[0-9]+[A-Z][0-9]?").unwrap());

const COMMENT_MARKER: &str = "//";

/// Extract the problem identifier and thoughts from `text`.
pub fn extract(text: &str) -> Snapshot {
    Snapshot {
        problem_id: problem_id(text),
        code: text.to_string(),
        thoughts: thoughts(text),
    }
}

/// First problem tag in document order.
pub fn problem_id(text: &str) -> Option<ProblemId> {
    PROBLEM_TAG
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ProblemId::parse(m.as_str()).ok())
}

/// Every line comment body, tag removed and trimmed, non-empty ones joined by `\n`.
pub fn thoughts(text: &str) -> String {
    text.lines()
        .filter_map(comment_body)
        .map(|body| {
            let without_tag = TAG_IN_BODY.replace_all(body, "");
            without_tag.trim().to_string()
        })
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text after the first `//` on the line.
fn comment_body(line: &str) -> Option<&str> {
    line.find(COMMENT_MARKER)
        .map(|at| &line[at + COMMENT_MARKER.len()..])
}
