//! Issue records on both sides of the normalizer.
//!
//! [`RawIssue`] and [`RawRelation`] are what an [`IssueSource`] hands us;
//! [`NormalizedIssue`] is the immutable record the partitioner works from.
//!
//! [`IssueSource`]: crate::source::IssueSource

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relation kind that marks a blocking dependency.
pub const BLOCKS: &str = "blocks";

/// Workflow state type the tracker assigns to cancelled issues.
pub const CANCELED_STATE: &str = "canceled";

/// Estimate used in labels when an issue has none.
pub const DEFAULT_ESTIMATE: f64 = 1.0;

/// An issue as delivered by the upstream API, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    /// Opaque API node id, used for follow-up lookups.
    pub id: String,
    /// Human-facing identifier such as `ENG-12`. Globally unique.
    pub identifier: String,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimate: Option<f64>,
    /// Reference to the workflow state, resolved lazily by the source.
    #[serde(default)]
    pub state_id: Option<String>,
}

impl RawIssue {
    /// Build a bare issue with only an id and identifier set.
    pub fn new(id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            canceled_at: None,
            estimate: None,
            state_id: None,
        }
    }

    #[must_use]
    pub fn with_estimate(mut self, estimate: f64) -> Self {
        self.estimate = Some(estimate);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state_id: impl Into<String>) -> Self {
        self.state_id = Some(state_id.into());
        self
    }

    #[must_use]
    pub fn with_canceled_at(mut self, at: DateTime<Utc>) -> Self {
        self.canceled_at = Some(at);
        self
    }
}

/// A resolved workflow state. Only the `type` matters to us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(rename = "type")]
    pub state_type: String,
}

impl WorkflowState {
    pub fn new(state_type: impl Into<String>) -> Self {
        Self {
            state_type: state_type.into(),
        }
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.state_type == CANCELED_STATE
    }
}

/// A relation that points at an issue.
///
/// `related_issue` is the other end of the relation. For kind `"blocks"`
/// it is the issue doing the blocking. `None` means the reference could not
/// be resolved upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelation {
    pub kind: String,
    pub related_issue: Option<RawIssue>,
}

impl RawRelation {
    /// A `"blocks"` relation whose blocker is `blocker`.
    #[must_use]
    pub fn blocked_by(blocker: RawIssue) -> Self {
        Self {
            kind: BLOCKS.to_string(),
            related_issue: Some(blocker),
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.kind == BLOCKS
    }
}

/// Canonical, immutable issue record used for partitioning.
///
/// `blocked_by` only ever goes one level deep: entries carry an empty
/// `blocked_by` of their own. Longer chains are recovered by looking the
/// blocker up in the top-level set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIssue {
    pub identifier: String,
    pub label: String,
    pub blocked_by: Vec<NormalizedIssue>,
}

impl NormalizedIssue {
    /// Build a leaf record (no blockers) for `issue`.
    #[must_use]
    pub fn leaf(issue: &RawIssue) -> Self {
        Self {
            identifier: issue.identifier.clone(),
            label: build_label(&issue.identifier, issue.estimate),
            blocked_by: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.blocked_by.is_empty()
    }
}

/// Build the Mermaid node label for an issue.
///
/// A missing or zero estimate prints as the default of 1.
///
/// ```
/// use blockmap_core::model::build_label;
///
/// assert_eq!(build_label("X-1", Some(3.0)), r#"X-1["X-1<br/>(3)"]"#);
/// assert_eq!(build_label("X-1", None), r#"X-1["X-1<br/>(1)"]"#);
/// ```
#[must_use]
pub fn build_label(identifier: &str, estimate: Option<f64>) -> String {
    let estimate = estimate
        .filter(|e| e.is_normal())
        .unwrap_or(DEFAULT_ESTIMATE);
    format!("{identifier}[\"{identifier}<br/>({estimate})\"]")
}
