//! Ancestry Codec
//!
//! Parses, validates, and serializes the ancestry string: the single text
//! attribute that encodes a node's full lineage.
//!
//! # Encoding
//!
//! An ancestry value is one or more *branches* separated by `,`. Each branch
//! is a root-first chain of node ids separated by `/`, ending at the node's
//! immediate parent along that branch. A node with multiple branches is
//! reachable through more than one parent chain (a bounded multi-parent
//! forest rather than a strict tree). An absent or empty value means the node
//! is a root with no lineage.
//!
//! ```text
//! "1/4/30"     one branch: root 1, parent 30
//! "1/4,2/7"    two branches: parents 4 and 7, roots 1 and 2
//! ```
//!
//! `parse` then `serialize` is the identity for every valid value.

use crate::models::config::PrimaryKeyType;
use crate::models::node::{NodeId, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// Grammar for integer-keyed tables: branch(,branch)*, branch = id(/id)*
const INT_ANCESTRY_PATTERN: &str = r"^[0-9]+(/[0-9]+)*(,[0-9]+(/[0-9]+)*)*$";

// Grammar for string-keyed tables; ids come from the key alphabet
const STR_ANCESTRY_PATTERN: &str =
    r"^[A-Za-z0-9_-]+(/[A-Za-z0-9_-]+)*(,[A-Za-z0-9_-]+(/[A-Za-z0-9_-]+)*)*$";

fn ancestry_regex(key_type: PrimaryKeyType) -> &'static Regex {
    static INT_REGEX: OnceLock<Regex> = OnceLock::new();
    static STR_REGEX: OnceLock<Regex> = OnceLock::new();
    match key_type {
        PrimaryKeyType::Integer => {
            INT_REGEX.get_or_init(|| Regex::new(INT_ANCESTRY_PATTERN).unwrap())
        }
        PrimaryKeyType::String => {
            STR_REGEX.get_or_init(|| Regex::new(STR_ANCESTRY_PATTERN).unwrap())
        }
    }
}

/// Decoded ancestry value: zero or more root-first parent chains.
///
/// An empty branch list is the valid "no lineage" state of a root node, not
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    branches: Vec<Vec<NodeId>>,
}

impl Ancestry {
    /// The empty ancestry of a root node
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a stored ancestry value.
    ///
    /// `None` and the empty string are the valid root encoding. Anything else
    /// must match the branch grammar for the configured key type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treeline_core::models::{Ancestry, PrimaryKeyType};
    ///
    /// let parsed = Ancestry::parse(Some("1/4/30"), PrimaryKeyType::Integer).unwrap();
    /// assert_eq!(parsed.branches().len(), 1);
    ///
    /// assert!(Ancestry::parse(Some("1/3/"), PrimaryKeyType::Integer).is_err());
    /// assert!(Ancestry::parse(None, PrimaryKeyType::Integer).unwrap().is_root());
    /// ```
    pub fn parse(raw: Option<&str>, key_type: PrimaryKeyType) -> Result<Self, ValidationError> {
        let raw = match raw {
            None | Some("") => return Ok(Self::root()),
            Some(raw) => raw,
        };

        if !ancestry_regex(key_type).is_match(raw) {
            return Err(ValidationError::invalid_grammar(raw));
        }

        let mut branches = Vec::new();
        for branch in raw.split(',') {
            let mut chain = Vec::new();
            for token in branch.split('/') {
                chain.push(cast_key(token, key_type, raw)?);
            }
            branches.push(chain);
        }
        Ok(Self { branches })
    }

    /// Canonical serialized form; `None` for a root.
    ///
    /// `parse(serialize(x)) == x` for every valid `x`.
    pub fn serialize(&self) -> Option<String> {
        if self.branches.is_empty() {
            return None;
        }
        let branches: Vec<String> = self
            .branches
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();
        Some(branches.join(","))
    }

    /// The independent parent chains of this value, root-first
    pub fn branches(&self) -> &[Vec<NodeId>] {
        &self.branches
    }

    /// Whether this is the empty "no lineage" value
    pub fn is_root(&self) -> bool {
        self.branches.is_empty()
    }

    /// Whether any branch references the given id
    pub fn contains(&self, id: &NodeId) -> bool {
        self.branches.iter().any(|chain| chain.contains(id))
    }

    /// Reject an ancestry that references the node itself.
    ///
    /// A node's own id in its lineage would make it a descendant of itself.
    pub fn assert_excludes(&self, id: &NodeId) -> Result<(), ValidationError> {
        if self.contains(id) {
            Err(ValidationError::SelfAncestry)
        } else {
            Ok(())
        }
    }

    /// Rebuild from already-typed branches (used by orphan handling)
    pub fn from_branches(branches: Vec<Vec<NodeId>>) -> Self {
        Self { branches }
    }
}

fn cast_key(
    token: &str,
    key_type: PrimaryKeyType,
    raw: &str,
) -> Result<NodeId, ValidationError> {
    match key_type {
        PrimaryKeyType::Integer => token
            .parse::<i64>()
            .map(NodeId::Int)
            .map_err(|_| ValidationError::invalid_grammar(raw)),
        PrimaryKeyType::String => Ok(NodeId::Str(token.to_string())),
    }
}

/// Best-effort sanity check for a pending ancestry value.
///
/// Reparent propagation is skipped, not failed, when the new value is
/// malformed or self-referential; rewriting descendants against a bad prefix
/// would corrupt the whole subtree.
pub fn is_sane(raw: Option<&str>, id: Option<&NodeId>, key_type: PrimaryKeyType) -> bool {
    match Ancestry::parse(raw, key_type) {
        Err(_) => false,
        Ok(parsed) => match id {
            Some(id) => !parsed.contains(id),
            None => true,
        },
    }
}

#[cfg(test)]
#[path = "ancestry_test.rs"]
mod ancestry_test;
