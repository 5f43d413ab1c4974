//! Matcher tests: every textual position a reference can occupy, plus depth
//! bounds.

use crate::db::predicate::{DepthBound, DepthOp, NodeFilter, TextMatch};
use crate::models::{Node, NodeId};

fn node_with_ancestry(id: i64, ancestry: Option<&str>) -> Node {
    let mut node = Node::new();
    node.id = Some(NodeId::Int(id));
    node.set_text_attribute("ancestry", ancestry.map(str::to_string));
    node.mark_persisted();
    node
}

#[test]
fn descendants_match_every_reference_position() {
    let filter = NodeFilter::descendants_of("ancestry", &NodeId::Int(5));

    let hits = [
        "5",       // sole occupant: direct child of a root
        "5/7",     // value-leading chain
        "1/5",     // value-trailing: direct child of a non-root
        "1/5/9",   // chain interior
        "2,5/7",   // branch-leading after a separator
        "1/5,8",   // branch-trailing before a separator
        "3,6/5",   // trailing in a later branch
        "2,5,8",   // sole occupant of a middle branch
    ];
    for value in hits {
        assert!(
            filter.matches(&node_with_ancestry(99, Some(value))),
            "{value:?} should match id 5"
        );
    }

    let misses = ["50", "1/50", "15", "1/15/2", "55/5x"];
    for value in misses {
        assert!(
            !filter.matches(&node_with_ancestry(99, Some(value))),
            "{value:?} should not match id 5"
        );
    }
    // Roots reference nobody
    assert!(!filter.matches(&node_with_ancestry(99, None)));
}

#[test]
fn descendants_do_not_include_self_by_key() {
    let filter = NodeFilter::descendants_of("ancestry", &NodeId::Int(5));
    // The node itself (a root here) is not its own descendant
    assert!(!filter.matches(&node_with_ancestry(5, None)));
}

#[test]
fn subtree_adds_the_self_arm() {
    let filter = NodeFilter::subtree_of("ancestry", &NodeId::Int(5));
    assert!(filter.matches(&node_with_ancestry(5, None)));
    assert!(filter.matches(&node_with_ancestry(9, Some("1/5"))));
    assert!(!filter.matches(&node_with_ancestry(9, Some("1/2"))));
}

#[test]
fn among_ids_matches_on_primary_key() {
    let filter = NodeFilter::among_ids("ancestry", vec![NodeId::Int(1), NodeId::Int(3)]);
    assert!(filter.matches(&node_with_ancestry(1, None)));
    assert!(filter.matches(&node_with_ancestry(3, Some("1"))));
    assert!(!filter.matches(&node_with_ancestry(2, Some("1"))));
    // An empty filter selects nothing
    assert!(!NodeFilter::among_ids("ancestry", Vec::new())
        .matches(&node_with_ancestry(1, None)));
}

#[test]
fn children_and_siblings_and_roots() {
    let children = NodeFilter::children_with("ancestry", "1/2");
    assert!(children.matches(&node_with_ancestry(9, Some("1/2"))));
    assert!(!children.matches(&node_with_ancestry(9, Some("1/2/3"))));

    let root_siblings = NodeFilter::siblings_with("ancestry", None);
    assert!(root_siblings.matches(&node_with_ancestry(9, None)));
    assert!(root_siblings.matches(&node_with_ancestry(9, Some(""))));
    assert!(!root_siblings.matches(&node_with_ancestry(9, Some("1"))));

    let siblings = NodeFilter::siblings_with("ancestry", Some("1/2"));
    assert!(siblings.matches(&node_with_ancestry(9, Some("1/2"))));

    let roots = NodeFilter::roots("ancestry");
    assert!(roots.matches(&node_with_ancestry(9, None)));
    assert!(!roots.matches(&node_with_ancestry(9, Some("4"))));
}

#[test]
fn string_keyed_references() {
    let filter = NodeFilter::descendants_of("ancestry", &NodeId::from("b-2"));
    assert!(filter.matches(&node_with_ancestry(9, Some("a1/b-2/c3"))));
    assert!(!filter.matches(&node_with_ancestry(9, Some("a1/b-22"))));
}

#[test]
fn depth_bounds_compare_the_cached_column() {
    let mut node = node_with_ancestry(9, Some("1/2"));
    node.set_int_attribute("ancestry_depth", Some(2));

    let cases = [
        (DepthOp::Before, 3, true),
        (DepthOp::Before, 2, false),
        (DepthOp::To, 2, true),
        (DepthOp::At, 2, true),
        (DepthOp::At, 1, false),
        (DepthOp::From, 2, true),
        (DepthOp::After, 2, false),
        (DepthOp::After, 1, true),
    ];
    for (op, value, expected) in cases {
        let filter = NodeFilter::subtree_of("ancestry", &NodeId::Int(1))
            .with_depth(vec![DepthBound::new("ancestry_depth", op, value)]);
        assert_eq!(
            filter.matches(&node),
            expected,
            "depth 2 against {op:?} {value}"
        );
    }
}

#[test]
fn missing_depth_cache_never_satisfies_a_bound() {
    let node = node_with_ancestry(9, Some("1/2"));
    let filter = NodeFilter::descendants_of("ancestry", &NodeId::Int(1))
        .with_depth(vec![DepthBound::new("ancestry_depth", DepthOp::From, 0)]);
    assert!(!filter.matches(&node));
}

#[test]
fn depth_option_keys_resolve() {
    assert_eq!(DepthOp::from_key("before_depth"), Some(DepthOp::Before));
    assert_eq!(DepthOp::from_key("to_depth"), Some(DepthOp::To));
    assert_eq!(DepthOp::from_key("at_depth"), Some(DepthOp::At));
    assert_eq!(DepthOp::from_key("from_depth"), Some(DepthOp::From));
    assert_eq!(DepthOp::from_key("after_depth"), Some(DepthOp::After));
    assert_eq!(DepthOp::from_key("sideways_depth"), None);
}

#[test]
fn blank_arm_evaluation() {
    assert!(TextMatch::Blank.matches(None));
    assert!(TextMatch::Blank.matches(Some("")));
    assert!(!TextMatch::Blank.matches(Some("1")));
}
