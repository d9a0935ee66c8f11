//! End-to-end run: fetch → normalize → partition → render.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::cycles::issue_cycles;
use crate::error::Result;
use crate::model::NormalizedIssue;
use crate::normalize::{DEFAULT_CONCURRENCY, normalize_all};
use crate::partition::Partition;
use crate::render::render_mermaid;
use crate::source::{IssueSource, collect_all_issues};

/// Knobs for one graph run.
#[derive(Debug, Clone, Copy)]
pub struct GraphOptions {
    pub show_actionable: bool,
    /// Sort tracked issues by identifier before partitioning.
    pub sorted: bool,
    pub concurrency: usize,
    pub page_delay: Duration,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            show_actionable: false,
            sorted: false,
            concurrency: DEFAULT_CONCURRENCY,
            page_delay: Duration::from_millis(100),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct GraphReport {
    /// Issues returned by the listing, cancelled ones included.
    pub fetched: usize,
    pub issues: Vec<NormalizedIssue>,
    pub partition: Partition,
    pub cycles: Vec<Vec<String>>,
    /// Mermaid flowchart markup.
    pub graph: String,
}

impl GraphReport {
    /// Partition and render an already-normalized set.
    #[must_use]
    pub fn from_normalized(
        mut issues: Vec<NormalizedIssue>,
        fetched: usize,
        options: &GraphOptions,
    ) -> Self {
        if options.sorted {
            issues.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        }

        let partition = Partition::build(&issues, options.show_actionable);
        let cycles = issue_cycles(&issues);
        for cycle in &cycles {
            warn!(issues = %cycle.join(", "), "dependency cycle");
        }
        let graph = render_mermaid(&partition);

        Self {
            fetched,
            issues,
            partition,
            cycles,
            graph,
        }
    }
}

/// Build the dependency graph for `project_id`.
///
/// # Errors
///
/// Any fetch or lookup failure aborts the run; nothing partial is returned.
#[instrument(skip(source, options))]
pub async fn build_project_graph<S>(
    source: &S,
    project_id: &str,
    options: &GraphOptions,
) -> Result<GraphReport>
where
    S: IssueSource + ?Sized,
{
    info!("fetching issues");
    let raw = collect_all_issues(source, project_id, options.page_delay).await?;
    info!(count = raw.len(), "fetched issues");

    info!("determining workflow");
    let issues = normalize_all(source, &raw, options.concurrency).await?;
    info!(
        tracked = issues.len(),
        cancelled = raw.len().saturating_sub(issues.len()),
        "normalized issues"
    );

    info!("building graph");
    Ok(GraphReport::from_normalized(issues, raw.len(), options))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::RawIssue;
    use crate::testing::MemorySource;

    fn issue(id: &str) -> RawIssue {
        RawIssue::new(format!("id-{id}"), id)
    }

    fn options(show_actionable: bool) -> GraphOptions {
        GraphOptions {
            show_actionable,
            sorted: true,
            concurrency: 3,
            page_delay: Duration::ZERO,
        }
    }

    fn section_lines(report: &GraphReport, name: &str) -> Vec<String> {
        report
            .partition
            .sections()
            .into_iter()
            .find(|s| s.kind.name() == name)
            .map(|s| s.lines)
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn tracked_chain_scenario() {
        let source = MemorySource::new()
            .with_issues([issue("A"), issue("B"), issue("C")])
            .with_blocker("id-C", issue("B"));

        let report = build_project_graph(&source, "proj", &options(true))
            .await
            .unwrap();

        assert_eq!(section_lines(&report, "actionable"), ["A[\"A<br/>(1)\"]"]);
        assert_eq!(section_lines(&report, "priority"), ["B[\"B<br/>(1)\"]"]);
        assert_eq!(
            section_lines(&report, "blocked"),
            ["B[\"B<br/>(1)\"] --> C[\"C<br/>(1)\"]"]
        );
        assert!(section_lines(&report, "external-blocked-by").is_empty());
        assert!(report.cycles.is_empty());
    }

    #[tokio::test]
    async fn external_blocker_scenario() {
        let source = MemorySource::new()
            .with_issue(issue("D"))
            .with_blocker("id-D", issue("E"));

        let report = build_project_graph(&source, "proj", &options(true))
            .await
            .unwrap();

        assert_eq!(
            section_lines(&report, "blocked"),
            ["E[\"E<br/>(1)\"] --> D[\"D<br/>(1)\"]"]
        );
        assert_eq!(
            section_lines(&report, "external-blocked-by"),
            ["E[\"E<br/>(1)\"]"]
        );
    }

    #[tokio::test]
    async fn cancelled_issue_vanishes_everywhere() {
        let f = issue("F").with_canceled_at(Utc::now());
        let source = MemorySource::new()
            .with_issues([f.clone(), issue("G")])
            .with_blocker("id-G", f);

        let report = build_project_graph(&source, "proj", &options(true))
            .await
            .unwrap();

        assert_eq!(report.fetched, 2);
        assert!(!report.graph.contains("F["));
        assert_eq!(section_lines(&report, "actionable"), ["G[\"G<br/>(1)\"]"]);
    }

    #[tokio::test]
    async fn actionable_off_drops_free_issues() {
        let source = MemorySource::new().with_issues([issue("A")]);

        let report = build_project_graph(&source, "proj", &options(false))
            .await
            .unwrap();

        assert!(!report.graph.contains("subgraph actionable"));
        assert!(!report.graph.contains("A["));
        assert_eq!(report.partition.tracked, 1);
    }

    #[tokio::test]
    async fn sorted_output_is_reproducible() {
        let issues: Vec<RawIssue> = ["Z", "M", "A", "Q"].into_iter().map(issue).collect();
        let source = MemorySource::new().with_issues(issues);

        let first = build_project_graph(&source, "proj", &options(true))
            .await
            .unwrap();
        let second = build_project_graph(&source, "proj", &options(true))
            .await
            .unwrap();

        assert_eq!(first.graph, second.graph);
        let order: Vec<&str> = first.issues.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(order, ["A", "M", "Q", "Z"]);
    }

    #[tokio::test]
    async fn fetch_failure_produces_no_report() {
        let source = MemorySource::new()
            .with_issues((0..10).map(|n| issue(&format!("ENG-{n}"))))
            .with_page_size(5)
            .fail_page(2);

        assert!(build_project_graph(&source, "proj", &options(true)).await.is_err());
    }
}
