//! # coach-client
//!
//! Read side of the coaching backend: the statement list and per-problem
//! summaries, plus [`StatementBrowser`], a model of the browsing surface
//! that caches summaries by problem id.

#![deny(unsafe_code)]

pub mod api;
pub mod browser;
pub mod error;

pub use api::CoachApiClient;
pub use browser::{Panel, StatementBrowser};
pub use error::ClientError;
