pub mod completions;
pub mod graph;
