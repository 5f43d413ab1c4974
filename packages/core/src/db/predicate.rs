//! Query Predicates over the Ancestry Column
//!
//! The tree layer never executes queries itself; it hands an abstract
//! [`NodeFilter`] to the record store. A SQL-backed store can translate each
//! arm into `LIKE`/equality patterns over the ancestry column; an in-memory
//! store evaluates the same filter directly with [`NodeFilter::matches`].
//!
//! # Descendant matching
//!
//! A record is below node N exactly when N's id appears in its ancestry
//! string as a `/`-, `,`- or boundary-delimited token. The arm set built by
//! [`NodeFilter::descendants_of`] covers every textual position such a
//! reference can occupy: the whole value, branch start, branch end, and
//! chain interior.

use crate::models::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// One pattern arm over a text column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// NULL or empty value (roots)
    Blank,
    Equals(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
}

impl TextMatch {
    /// Evaluate this arm against a column value
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            TextMatch::Blank => value.is_none() || value == Some(""),
            TextMatch::Equals(pattern) => value == Some(pattern.as_str()),
            TextMatch::StartsWith(pattern) => {
                value.is_some_and(|v| v.starts_with(pattern.as_str()))
            }
            TextMatch::EndsWith(pattern) => value.is_some_and(|v| v.ends_with(pattern.as_str())),
            TextMatch::Contains(pattern) => value.is_some_and(|v| v.contains(pattern.as_str())),
        }
    }
}

/// Comparison applied to the cached depth column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthOp {
    /// Strictly above the given depth (closer to the root)
    Before,
    /// At or above the given depth
    To,
    /// Exactly at the given depth
    At,
    /// At or below the given depth
    From,
    /// Strictly below the given depth
    After,
}

impl DepthOp {
    /// Resolve a depth-option key; unknown keys are the caller's error
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "before_depth" => Some(Self::Before),
            "to_depth" => Some(Self::To),
            "at_depth" => Some(Self::At),
            "from_depth" => Some(Self::From),
            "after_depth" => Some(Self::After),
            _ => None,
        }
    }
}

/// Bound on the cached depth column.
///
/// Records without a cached depth value never satisfy a bound; the cache is
/// only as consistent as its last write-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthBound {
    pub column: String,
    pub op: DepthOp,
    pub value: i64,
}

impl DepthBound {
    pub fn new(column: &str, op: DepthOp, value: i64) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    /// Evaluate this bound against a record
    pub fn matches(&self, node: &Node) -> bool {
        let Some(depth) = node.int_attribute(&self.column) else {
            return false;
        };
        match self.op {
            DepthOp::Before => depth < self.value,
            DepthOp::To => depth <= self.value,
            DepthOp::At => depth == self.value,
            DepthOp::From => depth >= self.value,
            DepthOp::After => depth > self.value,
        }
    }
}

/// Abstract filter over one tree-enabled table.
///
/// A record matches when it satisfies *any* pattern arm over the ancestry
/// column *or* its primary key is in `ids`, and *all* depth bounds hold.
/// A filter with no arms and no ids selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    /// Ancestry column name the pattern arms apply to
    pub column: String,

    /// OR-set of pattern arms over the ancestry column
    pub any_of: Vec<TextMatch>,

    /// OR-arm on primary key membership (self-inclusion, id-set scopes)
    pub ids: Vec<NodeId>,

    /// AND-set of bounds on the cached depth column
    pub depth: Vec<DepthBound>,
}

impl NodeFilter {
    /// Every record whose ancestry references `id`: the descendant set.
    ///
    /// Covers the id as a delimited token in all positions — sole occupant
    /// of the value (direct child of a root), branch leading, branch
    /// trailing, and chain interior.
    pub fn descendants_of(column: &str, id: &NodeId) -> Self {
        Self {
            column: column.to_string(),
            any_of: reference_patterns(id),
            ids: Vec::new(),
            depth: Vec::new(),
        }
    }

    /// Descendants plus the node itself
    pub fn subtree_of(column: &str, id: &NodeId) -> Self {
        Self {
            column: column.to_string(),
            any_of: reference_patterns(id),
            ids: vec![id.clone()],
            depth: Vec::new(),
        }
    }

    /// Records whose primary key is in the given set (ancestor/path/lineage
    /// scopes)
    pub fn among_ids(column: &str, ids: Vec<NodeId>) -> Self {
        Self {
            column: column.to_string(),
            any_of: Vec::new(),
            ids,
            depth: Vec::new(),
        }
    }

    /// Records whose ancestry equals the given child-ancestry value: the
    /// direct children
    pub fn children_with(column: &str, child_ancestry: &str) -> Self {
        Self {
            column: column.to_string(),
            any_of: vec![TextMatch::Equals(child_ancestry.to_string())],
            ids: Vec::new(),
            depth: Vec::new(),
        }
    }

    /// Records sharing an ancestry value: the sibling group (roots when the
    /// value is blank)
    pub fn siblings_with(column: &str, ancestry: Option<&str>) -> Self {
        let arm = match ancestry {
            None | Some("") => TextMatch::Blank,
            Some(value) => TextMatch::Equals(value.to_string()),
        };
        Self {
            column: column.to_string(),
            any_of: vec![arm],
            ids: Vec::new(),
            depth: Vec::new(),
        }
    }

    /// Records with no lineage at all
    pub fn roots(column: &str) -> Self {
        Self {
            column: column.to_string(),
            any_of: vec![TextMatch::Blank],
            ids: Vec::new(),
            depth: Vec::new(),
        }
    }

    /// Attach depth bounds to this filter
    pub fn with_depth(mut self, bounds: Vec<DepthBound>) -> Self {
        self.depth = bounds;
        self
    }

    /// Evaluate the filter against a record, parse-and-compare style
    pub fn matches(&self, node: &Node) -> bool {
        let value = node.text_attribute(&self.column);
        let arm_hit = self.any_of.iter().any(|arm| arm.matches(value))
            || node
                .id
                .as_ref()
                .is_some_and(|id| self.ids.contains(id));
        arm_hit && self.depth.iter().all(|bound| bound.matches(node))
    }
}

/// Pattern arms matching `id` as a delimited token anywhere in an ancestry
/// string
fn reference_patterns(id: &NodeId) -> Vec<TextMatch> {
    let id = id.to_string();
    vec![
        TextMatch::Equals(id.clone()),
        TextMatch::StartsWith(format!("{id}/")),
        TextMatch::StartsWith(format!("{id},")),
        TextMatch::EndsWith(format!("/{id}")),
        TextMatch::EndsWith(format!(",{id}")),
        TextMatch::Contains(format!("/{id}/")),
        TextMatch::Contains(format!("/{id},")),
        TextMatch::Contains(format!(",{id}/")),
        TextMatch::Contains(format!(",{id},")),
    ]
}

#[cfg(test)]
#[path = "predicate_test.rs"]
mod predicate_test;
