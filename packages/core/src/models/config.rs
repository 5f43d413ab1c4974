//! Tree Configuration
//!
//! Per-table configuration for the tree layer: which column carries the
//! ancestry string, what happens to orphaned descendants on delete, whether
//! depth is cached, and how primary keys are typed.
//!
//! Column names are resolved once, at service construction, into a
//! [`ColumnAccessor`] getter/setter pair. After that, no attribute access
//! goes through a runtime name lookup.

use crate::models::node::Node;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Disposition of descendants when an ancestor is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanStrategy {
    /// Recursively delete every descendant
    Destroy,
    /// Strip the deleted node's prefix; direct children become roots
    Rootify,
    /// Promote descendants to children of the deleted node's own parent
    Adopt,
    /// Refuse to delete a node that has descendants
    Restrict,
}

impl Default for OrphanStrategy {
    fn default() -> Self {
        Self::Destroy
    }
}

/// Primary-key typing of the backing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryKeyType {
    Integer,
    String,
}

impl Default for PrimaryKeyType {
    fn default() -> Self {
        Self::Integer
    }
}

/// Configuration surface of one tree-enabled table.
///
/// # Examples
///
/// ```rust
/// use treeline_core::models::{OrphanStrategy, TreeConfig};
///
/// let config = TreeConfig::default();
/// assert_eq!(config.ancestry_column, "ancestry");
/// assert_eq!(config.orphan_strategy, OrphanStrategy::Destroy);
///
/// let config: TreeConfig =
///     serde_json::from_str(r#"{"orphan_strategy": "rootify", "cache_depth": true}"#).unwrap();
/// assert_eq!(config.orphan_strategy, OrphanStrategy::Rootify);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Text column holding the ancestry string
    pub ancestry_column: String,

    /// What happens to descendants when a node is deleted
    pub orphan_strategy: OrphanStrategy,

    /// Whether a numeric depth cache is maintained
    pub cache_depth: bool,

    /// Numeric column mirroring the node's depth, when `cache_depth` is on
    pub depth_cache_column: String,

    /// How node ids parsed out of ancestry strings are typed
    pub primary_key_type: PrimaryKeyType,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            ancestry_column: "ancestry".to_string(),
            orphan_strategy: OrphanStrategy::default(),
            cache_depth: false,
            depth_cache_column: "ancestry_depth".to_string(),
            primary_key_type: PrimaryKeyType::default(),
        }
    }
}

type Reader<T> = Arc<dyn Fn(&Node) -> Option<T> + Send + Sync>;
type Writer<T> = Arc<dyn Fn(&mut Node, Option<T>) + Send + Sync>;

/// Typed accessor for one configured column, resolved once.
///
/// Holds a (getter, setter) closure pair bound to the column name, so the
/// hot paths never re-interpret configuration per call.
#[derive(Clone)]
pub struct ColumnAccessor<T> {
    column: String,
    read: Reader<T>,
    write: Writer<T>,
}

impl<T> ColumnAccessor<T> {
    /// The configured column name (for predicates and diagnostics)
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn get(&self, node: &Node) -> Option<T> {
        (self.read)(node)
    }

    pub fn set(&self, node: &mut Node, value: Option<T>) {
        (self.write)(node, value)
    }
}

impl<T> fmt::Debug for ColumnAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnAccessor")
            .field("column", &self.column)
            .finish()
    }
}

impl ColumnAccessor<String> {
    /// Accessor over a text column
    pub fn text(column: &str) -> Self {
        let read_column = column.to_string();
        let write_column = column.to_string();
        Self {
            column: column.to_string(),
            read: Arc::new(move |node| {
                node.text_attribute(&read_column).map(str::to_string)
            }),
            write: Arc::new(move |node, value| node.set_text_attribute(&write_column, value)),
        }
    }
}

impl ColumnAccessor<i64> {
    /// Accessor over a numeric column
    pub fn numeric(column: &str) -> Self {
        let read_column = column.to_string();
        let write_column = column.to_string();
        Self {
            column: column.to_string(),
            read: Arc::new(move |node| node.int_attribute(&read_column)),
            write: Arc::new(move |node, value| node.set_int_attribute(&write_column, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.ancestry_column, "ancestry");
        assert_eq!(config.depth_cache_column, "ancestry_depth");
        assert!(!config.cache_depth);
        assert_eq!(config.primary_key_type, PrimaryKeyType::Integer);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: TreeConfig = serde_json::from_str(
            r#"{"ancestry_column": "lineage", "orphan_strategy": "restrict", "primary_key_type": "string"}"#,
        )
        .unwrap();
        assert_eq!(config.ancestry_column, "lineage");
        assert_eq!(config.orphan_strategy, OrphanStrategy::Restrict);
        assert_eq!(config.primary_key_type, PrimaryKeyType::String);
        assert_eq!(config.depth_cache_column, "ancestry_depth");
    }

    #[test]
    fn text_accessor_reads_and_writes() {
        let accessor = ColumnAccessor::text("lineage");
        let mut node = Node::new();
        assert_eq!(accessor.get(&node), None);

        accessor.set(&mut node, Some("1/2".to_string()));
        assert_eq!(accessor.get(&node), Some("1/2".to_string()));
        assert_eq!(node.text_attribute("lineage"), Some("1/2"));

        accessor.set(&mut node, None);
        assert_eq!(accessor.get(&node), None);
    }

    #[test]
    fn numeric_accessor_reads_and_writes() {
        let accessor = ColumnAccessor::numeric("ancestry_depth");
        let mut node = Node::new();
        accessor.set(&mut node, Some(4));
        assert_eq!(accessor.get(&node), Some(4));
    }
}
