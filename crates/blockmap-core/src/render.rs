//! Mermaid flowchart serialization.

use std::fmt::Write as _;

use crate::partition::Partition;

/// Diagram header: left-to-right flowchart.
pub const FLOWCHART_HEADER: &str = "flowchart LR";

/// Render a partition as Mermaid `flowchart` markup.
///
/// Each section becomes a `subgraph` block preceded by a blank line, with
/// one two-space-indented line per node or edge.
#[must_use]
pub fn render_mermaid(partition: &Partition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{FLOWCHART_HEADER}");

    for section in partition.sections() {
        let _ = writeln!(out, "\nsubgraph {}", section.kind.name());
        for line in &section.lines {
            let _ = writeln!(out, "  {line}");
        }
        let _ = writeln!(out, "end");
    }

    out
}
