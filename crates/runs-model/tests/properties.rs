//! Property-based tests for command analysis, cross-product specs and ordering.

use proptest::prelude::*;
use runs_model::path::{descendant_patterns, matches};
use runs_model::{natural_cmp, Change, Command, CrossSpec, RunPath, DEFAULT_DELIMITER};
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_.]{0,6}",
        "--[a-z]{1,5}",
        "--[a-z]{1,5}=[a-z0-9.]{1,4}",
    ]
}

fn command_line() -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 0..10).prop_map(|tokens| tokens.join(" "))
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,6}"
}

proptest! {
    #[test]
    fn diff_with_itself_is_unchanged(line in command_line()) {
        let command = Command::parse(&line);
        let diff = command.diff(&command);
        prop_assert!(diff.iter().all(|t| t.change == Change::Unchanged));
        prop_assert_eq!(diff.is_empty(), command.is_empty());
    }

    #[test]
    fn cross_product_round_trip(
        stem in "[a-z]{1,6}( [a-z.]{1,6})?",
        axes in prop::collection::btree_map("--[a-z]{1,4}", prop::collection::btree_set("[a-z0-9]{1,3}", 1..4), 0..4),
    ) {
        // Build the full Cartesian family, then recover it through a spec.
        let mut lines = vec![stem.clone()];
        for (key, values) in &axes {
            lines = lines
                .iter()
                .flat_map(|line| values.iter().map(move |v| format!("{line} {key}={v}")))
                .collect();
        }
        let original: Vec<Command> = lines.iter().map(|l| Command::parse(l)).collect();

        let spec = CrossSpec::from_commands(&original, &[], DEFAULT_DELIMITER).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: CrossSpec = serde_json::from_str(&json).unwrap();
        let recovered: Vec<Command> = parsed
            .expand(DEFAULT_DELIMITER)
            .unwrap()
            .iter()
            .map(|l| Command::parse(l))
            .collect();

        let count = |commands: &[Command]| {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for c in commands {
                *counts.entry(c.to_string()).or_default() += 1;
            }
            counts
        };
        prop_assert_eq!(count(&original), count(&recovered));
    }

    #[test]
    fn natural_order_is_numeric(prefix in "[a-z]{1,4}", a in 0u64..100_000, b in 0u64..100_000) {
        let ordering = natural_cmp(&format!("{prefix}{a}"), &format!("{prefix}{b}"));
        prop_assert_eq!(ordering, a.cmp(&b));
    }

    #[test]
    fn natural_order_is_antisymmetric(a in "[a-z0-9/]{0,8}", b in "[a-z0-9/]{0,8}") {
        prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
        if natural_cmp(&a, &b) == Ordering::Equal {
            prop_assert_eq!(&a, &b);
        }
    }

    #[test]
    fn descendant_patterns_cover_subtree(
        base in prop::collection::vec(segment(), 1..4),
        rest in prop::collection::vec(segment(), 0..3),
    ) {
        let base = RunPath::new(base.join("/")).unwrap();
        let run = base.join(rest.join("/")).unwrap();
        let [own, below] = descendant_patterns(base.as_str());
        prop_assert!(matches(&own, run.as_str()) || matches(&below, run.as_str()));
    }
}

#[test]
fn natural_order_example() {
    let mut items = vec!["a10", "a2"];
    items.sort_by(|a, b| natural_cmp(a, b));
    assert_eq!(items, vec!["a2", "a10"]);
}
