//! Lineage Deriver
//!
//! Pure derivations over a decoded [`Ancestry`] value and the node's own id.
//! None of these sets are ever stored; they are recomputed from the ancestry
//! string on demand.

use crate::models::ancestry::Ancestry;
use crate::models::node::NodeId;

/// All ids above the node, across every branch, de-duplicated.
///
/// Order follows first occurrence in the stored string; the first element of
/// a non-root node's list is therefore its root.
pub fn ancestor_ids(ancestry: &Ancestry) -> Vec<NodeId> {
    let mut seen = Vec::new();
    for chain in ancestry.branches() {
        for id in chain {
            if !seen.contains(id) {
                seen.push(id.clone());
            }
        }
    }
    seen
}

/// The immediate parent along each branch: the last id of every chain.
///
/// Empty for a root — a root having no parents is a normal state, not an
/// error.
pub fn parent_ids(ancestry: &Ancestry) -> Vec<NodeId> {
    ancestry
        .branches()
        .iter()
        .filter_map(|chain| chain.last().cloned())
        .collect()
}

/// The topmost singular node of the tree: first id of the first branch, or
/// the node itself when it has no lineage.
pub fn root_id(ancestry: &Ancestry, own_id: &NodeId) -> NodeId {
    ancestry
        .branches()
        .first()
        .and_then(|chain| chain.first())
        .cloned()
        .unwrap_or_else(|| own_id.clone())
}

/// Count of distinct ancestor ids.
///
/// This is a naive measure: a node with branches of different lengths has an
/// ambiguous true depth, and this count does not distinguish branch topology.
/// Kept as-is deliberately.
pub fn depth(ancestry: &Ancestry) -> usize {
    ancestor_ids(ancestry).len()
}

/// Ancestor ids plus the node's own id, root-first
pub fn path_ids(ancestry: &Ancestry, own_id: &NodeId) -> Vec<NodeId> {
    let mut ids = ancestor_ids(ancestry);
    ids.push(own_id.clone());
    ids
}

/// The ancestry value this node's children carry.
///
/// Built from the node's *stored* (pre-mutation) ancestry: the own id is
/// appended to every stored branch, or stands alone when the node has no
/// lineage. Reparent propagation relies on the pre-mutation form to locate
/// the old prefix in descendant strings.
pub fn child_ancestry(stored: Option<&str>, own_id: &NodeId) -> String {
    match stored {
        None | Some("") => own_id.to_string(),
        Some(value) => value
            .split(',')
            .map(|branch| format!("{}/{}", branch, own_id))
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod lineage_test;
