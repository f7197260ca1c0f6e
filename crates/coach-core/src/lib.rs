//! # coach-core
//!
//! Foundation types and the signal extractor for the coach bridge.
//!
//! This crate provides the shared vocabulary that the other coach crates
//! depend on:
//!
//! - **Branded IDs**: `DocumentId`, `ConnectionId` as newtypes for type safety
//! - **Problem identifiers**: [`ProblemId`], validated and uppercase-normalised
//! - **Snapshots**: [`Snapshot`], the immutable view of a document after a settled edit
//! - **Wire messages**: [`EditorMessage`], [`Statement`], [`Summary`]
//! - **Extraction**: [`extract`], pure text → snapshot
//! - **Backoff**: [`retry::backoff_delay`] used after failed connection attempts

#![deny(unsafe_code)]

pub mod extract;
pub mod ids;
pub mod messages;
pub mod problem;
pub mod retry;

pub use extract::extract;
pub use ids::{ConnectionId, DocumentId};
pub use messages::{EditorMessage, Snapshot, Statement, Summary};
pub use problem::{ProblemId, ProblemIdError};
