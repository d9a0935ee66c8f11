//! Splitting the normalized issue set into display sections.
//!
//! # Sections
//!
//! | Section               | Holds                                               |
//! |-----------------------|-----------------------------------------------------|
//! | `actionable`          | unblocked issues that block nothing tracked         |
//! | `priority`            | unblocked issues that block something tracked       |
//! | `external-blocked-by` | blockers that are not themselves tracked issues     |
//! | `blocked`             | one `blocker --> issue` edge per direct blocker     |
//!
//! Every tracked issue lands in exactly one of `actionable`, `priority` or
//! `blocked`. `actionable` is opt-in; when it is off those issues are left
//! out of the diagram entirely.
//!
//! # Ordering
//!
//! Entries follow the iteration order of the input slice. After a
//! concurrent normalization pass that is completion order, so two runs over
//! the same project can list lines differently. Sort the input first for
//! reproducible output.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;

use serde::Serialize;

use crate::model::NormalizedIssue;

/// Where a tracked issue is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Actionable,
    Priority,
    Blocked,
}

/// Named diagram sections, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Actionable,
    Priority,
    ExternalBlockedBy,
    Blocked,
}

impl SectionKind {
    /// Subgraph name used in the diagram.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Actionable => "actionable",
            Self::Priority => "priority",
            Self::ExternalBlockedBy => "external-blocked-by",
            Self::Blocked => "blocked",
        }
    }
}

/// A node as drawn in the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Node {
    pub identifier: String,
    pub label: String,
}

impl Node {
    fn of(issue: &NormalizedIssue) -> Self {
        Self {
            identifier: issue.identifier.clone(),
            label: issue.label.clone(),
        }
    }
}

/// `from` blocks `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
}

/// One rendered section: its kind and the lines inside the subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

/// Identifiers that block at least one tracked issue, deduplicated in
/// first-seen order.
#[must_use]
pub fn blocking_list(issues: &[NormalizedIssue]) -> Vec<String> {
    let mut seen = HashSet::new();
    issues
        .iter()
        .flat_map(|issue| &issue.blocked_by)
        .filter(|blocker| seen.insert(blocker.identifier.as_str()))
        .map(|blocker| blocker.identifier.clone())
        .collect()
}

/// Classify a tracked issue against the blocking list.
#[must_use]
pub fn classify(issue: &NormalizedIssue, blocking: &HashSet<&str>) -> Category {
    if issue.is_blocked() {
        Category::Blocked
    } else if blocking.contains(issue.identifier.as_str()) {
        Category::Priority
    } else {
        Category::Actionable
    }
}

/// The four-section view of a project's dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// `None` when the caller did not ask for the actionable section.
    pub actionable: Option<Vec<Node>>,
    pub priority: Vec<Node>,
    pub external_blocked_by: Vec<Node>,
    pub blocked: Vec<Edge>,
    pub blocking_list: Vec<String>,
    /// Number of tracked (top-level) issues the partition was built from.
    pub tracked: usize,
}

impl Partition {
    /// Partition `issues` into sections.
    ///
    /// External blockers are deduplicated globally: a blocker outside the
    /// tracked set is listed once however many tracked issues it blocks.
    #[must_use]
    pub fn build(issues: &[NormalizedIssue], include_actionable: bool) -> Self {
        let blocking_list = blocking_list(issues);
        let blocking: HashSet<&str> = blocking_list.iter().map(String::as_str).collect();
        let tracked: HashSet<&str> = issues.iter().map(|i| i.identifier.as_str()).collect();

        let mut actionable = Vec::new();
        let mut priority = Vec::new();
        let mut blocked = Vec::new();

        for issue in issues {
            match classify(issue, &blocking) {
                Category::Actionable => actionable.push(Node::of(issue)),
                Category::Priority => priority.push(Node::of(issue)),
                Category::Blocked => blocked.extend(issue.blocked_by.iter().map(|blocker| Edge {
                    from: Node::of(blocker),
                    to: Node::of(issue),
                })),
            }
        }

        let mut external_seen: HashSet<&str> = HashSet::new();
        let external_blocked_by = issues
            .iter()
            .flat_map(|issue| &issue.blocked_by)
            .filter(|blocker| !tracked.contains(blocker.identifier.as_str()))
            .filter(|blocker| external_seen.insert(blocker.identifier.as_str()))
            .map(Node::of)
            .collect();

        Self {
            actionable: include_actionable.then_some(actionable),
            priority,
            external_blocked_by,
            blocked,
            blocking_list,
            tracked: issues.len(),
        }
    }

    /// Every blocking edge, in section order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.blocked
    }

    /// Sections in emission order, with their subgraph lines.
    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::with_capacity(4);
        if let Some(actionable) = &self.actionable {
            sections.push(node_section(SectionKind::Actionable, actionable));
        }
        sections.push(node_section(SectionKind::Priority, &self.priority));
        sections.push(node_section(
            SectionKind::ExternalBlockedBy,
            &self.external_blocked_by,
        ));
        sections.push(Section {
            kind: SectionKind::Blocked,
            lines: self
                .blocked
                .iter()
                .map(|e| format!("{} --> {}", e.from.label, e.to.label))
                .collect(),
        });
        sections
    }

    /// Tracked issues that have at least one blocker.
    #[must_use]
    pub fn blocked_issue_count(&self) -> usize {
        let targets: HashSet<&str> = self
            .blocked
            .iter()
            .map(|e| e.to.identifier.as_str())
            .collect();
        targets.len()
    }
}

fn node_section(kind: SectionKind, nodes: &[Node]) -> Section {
    Section {
        kind,
        lines: nodes.iter().map(|n| n.label.clone()).collect(),
    }
}
