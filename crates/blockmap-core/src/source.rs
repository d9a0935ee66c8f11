//! The upstream issue source and sequential pagination over it.
//!
//! The core never talks HTTP itself. Everything it needs from the tracker
//! goes through [`IssueSource`]: page-at-a-time issue listing plus lazy
//! per-issue lookups for workflow state and relations.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::{RawIssue, RawRelation, WorkflowState};

/// One page of a project's issue listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePage {
    pub issues: Vec<RawIssue>,
    pub has_next_page: bool,
    /// Cursor to pass back to fetch the following page.
    pub end_cursor: Option<String>,
}

/// Paginated, lazily-resolving view of a project-management API.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch one page of the project's issues. `cursor` is `None` for the
    /// first page and the previous page's `end_cursor` afterwards.
    async fn fetch_page(&self, project_id: &str, cursor: Option<&str>) -> Result<IssuePage>;

    /// Resolve the workflow state an issue is in, if it has one.
    async fn workflow_state(&self, issue: &RawIssue) -> Result<Option<WorkflowState>>;

    /// Resolve the relations pointing at `issue`.
    ///
    /// For a `"blocks"` relation the `related_issue` is the blocker.
    async fn relations(&self, issue: &RawIssue) -> Result<Vec<RawRelation>>;
}

/// Walk every page of a project's issues, in order.
///
/// Pages are fetched one after another with `page_delay` between requests
/// so we stay under upstream rate limits. There is no retry: the first
/// failing page aborts the walk.
///
/// # Errors
///
/// Returns the first error from [`IssueSource::fetch_page`], or
/// [`Error::GraphQl`] if a page claims more results but carries no cursor.
#[instrument(skip(source))]
pub async fn collect_all_issues<S>(
    source: &S,
    project_id: &str,
    page_delay: Duration,
) -> Result<Vec<RawIssue>>
where
    S: IssueSource + ?Sized,
{
    let mut issues = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page_number = 1_usize;

    loop {
        let page = source.fetch_page(project_id, cursor.as_deref()).await?;
        issues.extend(page.issues);
        debug!(page = page_number, total = issues.len(), "fetched issue page");

        if !page.has_next_page {
            break;
        }

        cursor = Some(page.end_cursor.ok_or_else(|| {
            Error::GraphQl(format!(
                "page {page_number} reports more issues but has no end cursor"
            ))
        })?);

        tokio::time::sleep(page_delay).await;
        page_number += 1;
    }

    Ok(issues)
}
