//! Dependency cycle detection over a normalized issue set.
//!
//! # Edge Direction
//!
//! The graph uses edge direction `blocker → blocked`, same as the diagram.
//! A cycle means a group of issues that (transitively) block each other and
//! so can never become actionable. Cycles do not change partitioning; they
//! are reported so the user can fix the links upstream.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::NormalizedIssue;

/// Directed `blocker → blocked` graph keyed by identifier.
#[derive(Debug, Default)]
pub struct BlockingGraph {
    pub graph: DiGraph<String, ()>,
    pub node_map: HashMap<String, NodeIndex>,
}

impl BlockingGraph {
    /// Build the graph from tracked issues and their direct blockers.
    ///
    /// External blockers become nodes too. Duplicate edges are collapsed.
    #[must_use]
    pub fn from_issues(issues: &[NormalizedIssue]) -> Self {
        let mut built = Self::default();

        for issue in issues {
            let blocked = built.node(&issue.identifier);
            for blocker in &issue.blocked_by {
                let from = built.node(&blocker.identifier);
                if !built.graph.contains_edge(from, blocked) {
                    built.graph.add_edge(from, blocked, ());
                }
            }
        }

        built
    }

    fn node(&mut self, identifier: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(identifier) {
            return *idx;
        }
        let idx = self.graph.add_node(identifier.to_string());
        self.node_map.insert(identifier.to_string(), idx);
        idx
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Find all cycles currently present in `graph`.
///
/// Each entry is a sorted list of identifiers in one strongly connected
/// component. Self-blocking issues are reported as a one-element cycle.
#[must_use]
pub fn find_all_cycles(graph: &DiGraph<String, ()>) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|node| graph.find_edge(*node, *node).is_some())
        })
        .map(|component| {
            let mut ids: Vec<String> = component
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    cycles.sort_unstable();
    cycles
}

/// Cycles among `issues`, sorted for stable output.
#[must_use]
pub fn issue_cycles(issues: &[NormalizedIssue]) -> Vec<Vec<String>> {
    find_all_cycles(&BlockingGraph::from_issues(issues).graph)
}
