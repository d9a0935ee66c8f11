//! Raw issue → [`NormalizedIssue`] conversion.
//!
//! # Cancellation
//!
//! An issue counts as cancelled when `canceled_at` is set, or when its
//! workflow state resolves to type `"canceled"`. The state lookup always
//! runs when the timestamp is absent: upstream data sometimes leaves
//! `canceled_at` empty on issues that sit in a cancelled state.
//!
//! # Fan-out
//!
//! [`normalize_all`] runs up to `width` normalizations at once and collects
//! them in completion order. Callers must not rely on the output order
//! matching the input order.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::model::{NormalizedIssue, RawIssue};
use crate::source::IssueSource;

/// Default number of normalizations allowed in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Return `true` if `issue` is cancelled.
///
/// # Errors
///
/// Propagates a failed workflow-state lookup.
pub async fn is_canceled<S>(source: &S, issue: &RawIssue) -> Result<bool>
where
    S: IssueSource + ?Sized,
{
    if issue.canceled_at.is_some() {
        return Ok(true);
    }

    let state = source.workflow_state(issue).await?;
    Ok(state.is_some_and(|s| s.is_canceled()))
}

/// Normalize one issue. Returns `Ok(None)` for cancelled issues.
///
/// Only `"blocks"` relations are kept. Relations whose related issue did
/// not resolve are skipped, as are cancelled blockers. Blockers are built
/// one level deep and keep the upstream relation order.
///
/// # Errors
///
/// Propagates any failed state or relation lookup.
pub async fn normalize_issue<S>(source: &S, issue: &RawIssue) -> Result<Option<NormalizedIssue>>
where
    S: IssueSource + ?Sized,
{
    if is_canceled(source, issue).await? {
        debug!(issue = %issue.identifier, "skipping cancelled issue");
        return Ok(None);
    }

    let mut blocked_by = Vec::new();
    for relation in source.relations(issue).await? {
        if !relation.is_blocking() {
            continue;
        }

        let Some(blocker) = relation.related_issue else {
            debug!(issue = %issue.identifier, "blocking relation without a resolvable issue");
            continue;
        };

        if is_canceled(source, &blocker).await? {
            debug!(issue = %issue.identifier, blocker = %blocker.identifier, "dropping cancelled blocker");
            continue;
        }

        blocked_by.push(NormalizedIssue::leaf(&blocker));
    }

    let mut normalized = NormalizedIssue::leaf(issue);
    normalized.blocked_by = blocked_by;
    Ok(Some(normalized))
}

/// Normalize every issue with at most `width` lookups in flight.
///
/// Results arrive in completion order. Cancelled issues are dropped, and
/// if the same identifier completes twice only the first is kept so the
/// top-level set stays keyed by identifier.
///
/// # Errors
///
/// The first failing normalization aborts the whole batch.
#[instrument(skip(source, issues), fields(issues = issues.len()))]
pub async fn normalize_all<S>(
    source: &S,
    issues: &[RawIssue],
    width: usize,
) -> Result<Vec<NormalizedIssue>>
where
    S: IssueSource + ?Sized,
{
    let mut seen: HashSet<String> = HashSet::with_capacity(issues.len());
    let mut normalized = Vec::with_capacity(issues.len());

    let mut results = stream::iter(issues)
        .map(|issue| normalize_issue(source, issue))
        .buffer_unordered(width.max(1));

    while let Some(next) = results.try_next().await? {
        let Some(issue) = next else {
            continue;
        };
        if seen.insert(issue.identifier.clone()) {
            normalized.push(issue);
        } else {
            warn!(issue = %issue.identifier, "duplicate issue in listing; keeping first");
        }
    }

    Ok(normalized)
}
