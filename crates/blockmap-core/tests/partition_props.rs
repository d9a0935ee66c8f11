//! Property tests for the section partitioning rules.

use std::collections::{BTreeSet, HashSet};

use blockmap_core::model::{NormalizedIssue, build_label};
use blockmap_core::partition::{Partition, blocking_list};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn leaf(id: &str) -> NormalizedIssue {
    NormalizedIssue {
        identifier: id.to_string(),
        label: build_label(id, None),
        blocked_by: Vec::new(),
    }
}

/// A tracked set `T-0..n` whose blockers are drawn from the tracked ids
/// plus a few external ids `X-0..4`.
fn issue_set() -> impl Strategy<Value = Vec<NormalizedIssue>> {
    (1usize..12).prop_flat_map(|n| {
        let pool = n + 4;
        prop::collection::vec(prop::collection::vec(0..pool, 0..4), n).prop_map(move |blockers| {
            blockers
                .into_iter()
                .enumerate()
                .map(|(i, picks)| {
                    let mut issue = leaf(&format!("T-{i}"));
                    issue.blocked_by = picks
                        .into_iter()
                        .map(|p| {
                            if p < n {
                                leaf(&format!("T-{p}"))
                            } else {
                                leaf(&format!("X-{}", p - n))
                            }
                        })
                        .collect();
                    issue
                })
                .collect()
        })
    })
}

fn line_sets(p: &Partition) -> Vec<(String, BTreeSet<String>)> {
    p.sections()
        .into_iter()
        .map(|s| (s.kind.name().to_string(), s.lines.into_iter().collect()))
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_sections_are_exclusive_and_exhaustive(issues in issue_set()) {
        let p = Partition::build(&issues, true);
        let actionable: HashSet<&str> = p.actionable.as_deref().unwrap_or_default()
            .iter().map(|n| n.identifier.as_str()).collect();
        let priority: HashSet<&str> = p.priority.iter().map(|n| n.identifier.as_str()).collect();
        let blocked: HashSet<&str> = p.blocked.iter().map(|e| e.to.identifier.as_str()).collect();

        for issue in &issues {
            let id = issue.identifier.as_str();
            let hits = [&actionable, &priority, &blocked]
                .iter()
                .filter(|set| set.contains(id))
                .count();
            prop_assert_eq!(hits, 1, "{} placed in {} sections", id, hits);
        }
        prop_assert_eq!(actionable.len() + priority.len() + blocked.len(), issues.len());
    }

    #[test]
    fn prop_hidden_actionable_is_dropped_not_moved(issues in issue_set()) {
        let with = Partition::build(&issues, true);
        let without = Partition::build(&issues, false);
        let dropped = with.actionable.as_deref().unwrap_or_default().len();

        prop_assert!(without.actionable.is_none());
        prop_assert_eq!(&with.priority, &without.priority);
        prop_assert_eq!(
            without.priority.len() + without.blocked_issue_count() + dropped,
            issues.len()
        );
    }

    #[test]
    fn prop_external_is_exactly_untracked_blockers(issues in issue_set()) {
        let p = Partition::build(&issues, false);
        let tracked: HashSet<&str> = issues.iter().map(|i| i.identifier.as_str()).collect();
        let blocking = blocking_list(&issues);
        let expected: BTreeSet<&str> = blocking
            .iter()
            .map(String::as_str)
            .filter(|id| !tracked.contains(id))
            .collect();
        let external: Vec<&str> = p.external_blocked_by.iter().map(|n| n.identifier.as_str()).collect();
        let external_set: BTreeSet<&str> = external.iter().copied().collect();

        prop_assert_eq!(external.len(), external_set.len(), "no duplicate external lines");
        prop_assert_eq!(external_set, expected);
        prop_assert!(external.iter().all(|id| !tracked.contains(id)));
    }

    #[test]
    fn prop_line_sets_ignore_input_order(
        (issues, shuffled) in issue_set().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        show_actionable in any::<bool>(),
    ) {
        let a = Partition::build(&issues, show_actionable);
        let b = Partition::build(&shuffled, show_actionable);
        prop_assert_eq!(line_sets(&a), line_sets(&b));
    }

    #[test]
    fn prop_one_edge_per_blocker(issues in issue_set()) {
        let p = Partition::build(&issues, true);
        let expected: usize = issues.iter().map(|i| i.blocked_by.len()).sum();
        prop_assert_eq!(p.edges().len(), expected);
    }
}
