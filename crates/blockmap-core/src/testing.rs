//! In-memory [`IssueSource`] for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{RawIssue, RawRelation, WorkflowState};
use crate::source::{IssuePage, IssueSource};

/// A fixed snapshot served page by page, with request accounting.
#[derive(Debug)]
pub struct MemorySource {
    issues: Vec<RawIssue>,
    states: HashMap<String, WorkflowState>,
    relations: HashMap<String, Vec<RawRelation>>,
    page_size: usize,
    failing_page: Option<usize>,
    failing_relations: HashSet<String>,
    lookup_delay: Duration,
    page_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            states: HashMap::new(),
            relations: HashMap::new(),
            page_size: 50,
            failing_page: None,
            failing_relations: HashSet::new(),
            lookup_delay: Duration::ZERO,
            page_requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_issues(mut self, issues: impl IntoIterator<Item = RawIssue>) -> Self {
        self.issues.extend(issues);
        self
    }

    #[must_use]
    pub fn with_issue(mut self, issue: RawIssue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Register a workflow state under `state_id`.
    #[must_use]
    pub fn with_state(mut self, state_id: &str, state_type: &str) -> Self {
        self.states
            .insert(state_id.to_string(), WorkflowState::new(state_type));
        self
    }

    /// Attach a relation pointing at the issue with API id `issue_id`.
    #[must_use]
    pub fn with_relation(mut self, issue_id: &str, relation: RawRelation) -> Self {
        self.relations
            .entry(issue_id.to_string())
            .or_default()
            .push(relation);
        self
    }

    /// Shorthand for a `"blocks"` relation: `blocker` blocks `issue_id`.
    #[must_use]
    pub fn with_blocker(self, issue_id: &str, blocker: RawIssue) -> Self {
        self.with_relation(issue_id, RawRelation::blocked_by(blocker))
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the 1-based page `page` fail.
    #[must_use]
    pub const fn fail_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    /// Make relation lookups for `issue_id` fail.
    #[must_use]
    pub fn fail_relations(mut self, issue_id: &str) -> Self {
        self.failing_relations.insert(issue_id.to_string());
        self
    }

    /// Hold every relation lookup for `delay` so lookups overlap.
    #[must_use]
    pub const fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Highest number of relation lookups observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueSource for MemorySource {
    async fn fetch_page(&self, _project_id: &str, cursor: Option<&str>) -> Result<IssuePage> {
        let page_number = self.page_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_page == Some(page_number) {
            return Err(Error::fetch(
                format!("fetch issues page {page_number}"),
                "injected failure",
            ));
        }

        let start = match cursor {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| Error::fetch(format!("bad cursor {raw}"), e))?,
            None => 0,
        };
        let end = (start + self.page_size).min(self.issues.len());
        let issues = self.issues.get(start..end).unwrap_or_default().to_vec();
        let has_next_page = end < self.issues.len();

        Ok(IssuePage {
            issues,
            has_next_page,
            end_cursor: has_next_page.then(|| end.to_string()),
        })
    }

    async fn workflow_state(&self, issue: &RawIssue) -> Result<Option<WorkflowState>> {
        Ok(issue
            .state_id
            .as_ref()
            .and_then(|id| self.states.get(id))
            .cloned())
    }

    async fn relations(&self, issue: &RawIssue) -> Result<Vec<RawRelation>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_relations.contains(&issue.id) {
            return Err(Error::fetch(
                format!("fetch relations for {}", issue.identifier),
                "injected failure",
            ));
        }

        Ok(self.relations.get(&issue.id).cloned().unwrap_or_default())
    }
}
