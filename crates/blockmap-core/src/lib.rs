#![forbid(unsafe_code)]
//! blockmap-core library.
//!
//! Turns a project's issues and their "blocks" relations into a Mermaid
//! flowchart split into actionable, priority, external-blocked-by and
//! blocked sections.
//!
//! # Conventions
//!
//! - **Errors**: Return [`Result`] with the crate [`Error`]; the binary wraps
//!   these in `anyhow`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod cycles;
pub mod error;
pub mod link;
pub mod model;
pub mod normalize;
pub mod partition;
pub mod pipeline;
pub mod render;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, ErrorCode, Result};
pub use model::{NormalizedIssue, RawIssue, RawRelation, WorkflowState};
pub use partition::Partition;
pub use pipeline::{GraphOptions, GraphReport, build_project_graph};
pub use source::{IssuePage, IssueSource};
