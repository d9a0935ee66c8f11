//! `blockmap graph`: render a project's blocking relations.
//!
//! - Text mode prints the Mermaid flowchart on stdout and the mermaid.live
//!   link on stderr, framed by separators.
//! - JSON mode prints one document with the markup, the link, every section
//!   and any dependency cycles.
//!
//! Nothing reaches stdout until every stage has succeeded.

use std::io::{self, Write};

use clap::Args;
use serde::Serialize;
use tracing::debug;

use blockmap_core::config::{Settings, load_user_config, resolve_settings};
use blockmap_core::link::build_link;
use blockmap_core::partition::{Edge, Node};
use blockmap_core::{GraphOptions, GraphReport, build_project_graph};

use crate::linear::LinearClient;
use crate::output::{CliError, OutputMode, render_error, write_result};

const SEPARATOR: &str = "------";

// ---------------------------------------------------------------------------
// Clap types
// ---------------------------------------------------------------------------

/// Arguments for `blockmap graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Linear project id.
    pub project_id: String,

    /// Include the actionable section (unblocked issues that block nothing).
    #[arg(long, overrides_with = "no_show_actionable")]
    pub show_actionable: bool,

    /// Hide the actionable section even when the user config enables it.
    #[arg(long, overrides_with = "show_actionable")]
    pub no_show_actionable: bool,

    /// Sort issues by identifier so repeated runs print identical output.
    #[arg(long)]
    pub sorted: bool,

    /// Maximum number of issue lookups in flight.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    /// Skip building the mermaid.live link.
    #[arg(long)]
    pub no_link: bool,
}

impl GraphArgs {
    fn options(&self, settings: &Settings) -> GraphOptions {
        GraphOptions {
            show_actionable: !self.no_show_actionable
                && (self.show_actionable || settings.show_actionable),
            sorted: self.sorted,
            concurrency: self
                .concurrency
                .map_or(settings.concurrency, usize::from),
            page_delay: settings.page_delay,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON document
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SectionsDoc<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    actionable: Option<&'a [Node]>,
    priority: &'a [Node],
    external_blocked_by: &'a [Node],
    blocked: &'a [Edge],
}

#[derive(Debug, Serialize)]
struct CountsDoc {
    fetched: usize,
    tracked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    actionable: Option<usize>,
    priority: usize,
    external_blocked_by: usize,
    blocked_issues: usize,
    edges: usize,
    cycles: usize,
}

#[derive(Debug, Serialize)]
struct GraphDocument<'a> {
    project_id: &'a str,
    graph: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
    sections: SectionsDoc<'a>,
    cycles: &'a [Vec<String>],
    counts: CountsDoc,
}

impl<'a> GraphDocument<'a> {
    fn new(project_id: &'a str, report: &'a GraphReport, link: Option<&'a str>) -> Self {
        let partition = &report.partition;
        Self {
            project_id,
            graph: &report.graph,
            link,
            sections: SectionsDoc {
                actionable: partition.actionable.as_deref(),
                priority: &partition.priority,
                external_blocked_by: &partition.external_blocked_by,
                blocked: partition.edges(),
            },
            cycles: &report.cycles,
            counts: CountsDoc {
                fetched: report.fetched,
                tracked: report.issues.len(),
                actionable: partition.actionable.as_ref().map(Vec::len),
                priority: partition.priority.len(),
                external_blocked_by: partition.external_blocked_by.len(),
                blocked_issues: partition.blocked_issue_count(),
                edges: partition.edges().len(),
                cycles: report.cycles.len(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

fn fail(output: OutputMode, err: blockmap_core::Error) -> anyhow::Error {
    render_error(output, &CliError::from(&err)).ok();
    anyhow::Error::new(err)
}

/// Execute `blockmap graph`.
///
/// # Errors
///
/// Fails before any network call when `LINEAR_API_KEY` is missing, and on
/// any fetch, lookup or link-encoding failure afterwards.
pub async fn run_graph(args: &GraphArgs, output: OutputMode) -> anyhow::Result<()> {
    let user = load_user_config().map_err(|e| fail(output, e))?;
    let settings = resolve_settings(user).map_err(|e| fail(output, e))?;
    let options = args.options(&settings);
    debug!(?options, api_url = %settings.api_url, "resolved settings");

    let client = LinearClient::new(&settings).map_err(|e| fail(output, e))?;
    let report = build_project_graph(&client, &args.project_id, &options)
        .await
        .map_err(|e| fail(output, e))?;
    debug!(requests = client.request_count(), "linear requests issued");

    let link = if args.no_link {
        None
    } else {
        Some(build_link(&report.graph).map_err(|e| fail(output, e))?)
    };

    let doc = GraphDocument::new(&args.project_id, &report, link.as_deref());
    emit(output, &doc, &mut io::stdout().lock(), &mut io::stderr().lock())
}

/// Write a finished run: the result on `out`, framing and link on `err`.
fn emit(
    output: OutputMode,
    doc: &GraphDocument<'_>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> anyhow::Result<()> {
    if output.is_json() {
        return write_result(output, doc, |_, _| Ok(()), out);
    }

    writeln!(err, "\n{SEPARATOR}\n")?;
    write_result(output, doc, |doc, w| w.write_all(doc.graph.as_bytes()), out)?;
    out.flush()?;
    writeln!(err, "{SEPARATOR}\n")?;
    if let Some(link) = doc.link {
        writeln!(err, "{link}")?;
    }
    Ok(())
}
