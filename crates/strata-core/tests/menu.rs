// crates/strata-core/tests/menu.rs
// ============================================================================
// Module: Menu Graph Tests
// Description: DAG validation and deterministic execution order.
// ============================================================================
//! ## Overview
//! Builds menus from chains and checks that the execution order is a stable
//! topological order regardless of declaration order, and that malformed
//! graphs are rejected with the right error.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use strata_core::MenuError;
use strata_core::MenuGraph;
use strata_core::menu::ROOT_NODE;
use strata_core::proto::Chain;
use strata_core::proto::Node;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a node.
fn node(name: &str, parents: &[&str], algorithms: &[&str]) -> Node {
    Node {
        name: name.to_string(),
        parents: parents.iter().map(ToString::to_string).collect(),
        algorithms: algorithms.iter().map(ToString::to_string).collect(),
    }
}

/// Wraps nodes in a single chain.
fn chain(name: &str, nodes: Vec<Node>) -> Chain {
    Chain {
        name: name.to_string(),
        nodes,
    }
}

/// Random DAG: node `i` picks distinct parents among the root and nodes `< i`.
fn dag_strategy() -> impl Strategy<Value = Vec<Node>> {
    (1_usize .. 12).prop_flat_map(|n| {
        let picks: Vec<_> = (0 .. n).map(|i| prop::collection::btree_set(0 ..= i, 1 ..= (i + 1).min(3))).collect();
        picks.prop_map(|sets| {
            sets.into_iter()
                .enumerate()
                .map(|(i, parents)| {
                    let parents: Vec<String> = parents
                        .into_iter()
                        .map(|p| if p == 0 { ROOT_NODE.to_string() } else { format!("n{}", p - 1) })
                        .collect();
                    Node {
                        name: format!("n{i}"),
                        parents,
                        algorithms: vec![format!("algo{}", i % 4)],
                    }
                })
                .collect()
        })
    })
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

proptest! {
    /// Verifies the execution order ignores declaration order and respects every edge.
    #[test]
    fn order_is_deterministic_topological(nodes in dag_strategy(), seed in any::<u64>()) {
        let forward = MenuGraph::from_chains("m", "menu", vec![chain("c", nodes.clone())]).unwrap();
        let mut shuffled = nodes;
        let len = shuffled.len();
        for i in 0 .. len {
            let j = usize::try_from(seed.rotate_left(u32::try_from(i).unwrap()) % len as u64).unwrap();
            shuffled.swap(i, j);
        }
        let (left, right) = shuffled.split_at(len / 2);
        let reordered = MenuGraph::from_chains("m", "menu", vec![
            chain("tail", right.to_vec()),
            chain("head", left.to_vec()),
        ])
        .unwrap();
        prop_assert_eq!(forward.topological_order(), reordered.topological_order());
        let order = forward.topological_order();
        prop_assert_eq!(order[0].as_str(), ROOT_NODE);
        prop_assert_eq!(order.len(), len + 1);
        for (pos, name) in order.iter().enumerate() {
            for parent in &forward.node(name).unwrap().parents {
                let parent_pos = order.iter().position(|n| n == parent).unwrap();
                prop_assert!(parent_pos < pos, "{parent} must precede {name}");
            }
        }
    }
}

/// Verifies leaves and algorithms of a two-branch menu.
#[test]
fn leaves_and_algorithms_follow_order() {
    let menu = MenuGraph::from_chains("m", "menu", vec![
        chain("parse", vec![node("parse", &[ROOT_NODE], &["csvparser"])]),
        chain("profile", vec![
            node("filter", &["parse"], &["filter"]),
            node("profile", &["parse"], &["profiler", "csvparser"]),
        ]),
    ])
    .unwrap();
    assert_eq!(menu.topological_order(), [ROOT_NODE, "parse", "filter", "profile"]);
    assert_eq!(menu.leaves(), ["filter", "profile"]);
    assert_eq!(menu.algorithms(), ["csvparser", "filter", "profiler"]);
    assert_eq!(menu.node("parse").unwrap().children, ["filter", "profile"]);
}

/// Verifies a bare root is its own leaf and the graph survives serialization.
#[test]
fn bare_root_is_leaf() {
    let menu = MenuGraph::from_chains("id", "empty", Vec::new()).unwrap();
    assert_eq!(menu.leaves(), [ROOT_NODE]);
    assert!(menu.algorithms().is_empty());
    let restored = MenuGraph::from_message(&menu.to_message()).unwrap();
    assert_eq!(restored, menu);
}

/// Verifies identical redeclarations merge across chains.
#[test]
fn identical_redeclaration_is_accepted() {
    let parse = node("parse", &[ROOT_NODE], &["csvparser"]);
    let menu = MenuGraph::from_chains("m", "menu", vec![
        chain("a", vec![parse.clone()]),
        chain("b", vec![parse, node("out", &["parse"], &["filter"])]),
    ])
    .unwrap();
    assert_eq!(menu.topological_order().len(), 3);
}

// ============================================================================
// SECTION: Rejections
// ============================================================================

/// Verifies a reference to an undeclared parent is rejected.
#[test]
fn unknown_parent_is_rejected() {
    let err = MenuGraph::from_chains("m", "menu", vec![chain("c", vec![node("a", &["missing"], &["x"])])]).unwrap_err();
    assert_eq!(err, MenuError::UnknownParent {
        node: "a".to_string(),
        parent: "missing".to_string(),
    });
}

/// Verifies cycles are reported with the stuck nodes.
#[test]
fn cycle_is_rejected() {
    let err = MenuGraph::from_chains("m", "menu", vec![chain("c", vec![
        node("a", &[ROOT_NODE, "c"], &["x"]),
        node("b", &["a"], &["x"]),
        node("c", &["b"], &["x"]),
    ])])
    .unwrap_err();
    let MenuError::Cycle(nodes) = err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert_eq!(nodes, ["a", "b", "c"]);
}

/// Verifies conflicting definitions of one node are rejected.
#[test]
fn conflicting_duplicate_is_rejected() {
    let err = MenuGraph::from_chains("m", "menu", vec![
        chain("a", vec![node("parse", &[ROOT_NODE], &["csvparser"])]),
        chain("b", vec![node("parse", &[ROOT_NODE], &["legacy"])]),
    ])
    .unwrap_err();
    assert_eq!(err, MenuError::DuplicateNode("parse".to_string()));
}

/// Verifies non-root nodes must declare a parent.
#[test]
fn parentless_node_is_rejected() {
    let err = MenuGraph::from_chains("m", "menu", vec![chain("c", vec![node("orphan", &[], &["x"])])]).unwrap_err();
    assert!(matches!(err, MenuError::Invalid(_)), "{err:?}");
}

/// Verifies a node listing the same parent twice is rejected as malformed, not as a cycle.
#[test]
fn repeated_parent_is_rejected() {
    let chains = vec![chain("c", vec![node("a", &["initial"], &["x"]), node("b", &["a", "initial", "a"], &["y"])])];
    let err = MenuGraph::from_chains("m", "menu", chains).unwrap_err();
    assert!(matches!(&err, MenuError::Invalid(msg) if msg.contains("parent a more than once")), "{err:?}");
}
