//! Contest-style problem identifiers.
//!
//! A problem identifier is one or more digits (the contest number) followed by
//! exactly one letter and an optional trailing digit (the index), e.g. `1234B`
//! or `1873G2`. Identifiers are always stored uppercase.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a [`ProblemId`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProblemIdError {
    /// The input was empty or whitespace.
    #[error("problem id is empty")]
    Empty,
    /// The input did not match `<digits><letter><optional digit>`.
    #[error("malformed problem id: {0:?}")]
    Malformed(String),
}

/// A validated, uppercase problem identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProblemId(String);

impl ProblemId {
    /// Parse and normalise an identifier. Input is case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, ProblemIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProblemIdError::Empty);
        }
        let upper = trimmed.to_ascii_uppercase();
        let digits = upper.bytes().take_while(u8::is_ascii_digit).count();
        let rest = &upper.as_bytes()[digits..];
        let valid = digits > 0
            && match rest {
                [letter] => letter.is_ascii_uppercase(),
                [letter, digit] => letter.is_ascii_uppercase() && digit.is_ascii_digit(),
                _ => false,
            };
        if valid {
            Ok(Self(upper))
        } else {
            Err(ProblemIdError::Malformed(trimmed.to_string()))
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Contest number: the leading digits (`1873` for `1873G2`).
    pub fn contest(&self) -> &str {
        let split = self.split_at();
        &self.0[..split]
    }

    /// Problem index within the contest (`G2` for `1873G2`).
    pub fn index(&self) -> &str {
        let split = self.split_at();
        &self.0[split..]
    }

    /// Public problemset page for this problem.
    pub fn problemset_url(&self) -> String {
        format!(
            "https://codeforces.com/problemset/problem/{}/{}",
            self.contest(),
            self.index()
        )
    }

    fn split_at(&self) -> usize {
        self.0.bytes().take_while(u8::is_ascii_digit).count()
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProblemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProblemId {
    type Error = ProblemIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProblemId> for String {
    fn from(id: ProblemId) -> Self {
        id.0
    }
}
