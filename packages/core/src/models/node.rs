//! Node Record Structures
//!
//! This module defines the flat `Node` record the tree layer operates on,
//! together with its primary-key type and change tracking.
//!
//! # Architecture
//!
//! - **Flat record**: a node is one row of a flat table; all tree structure
//!   lives in a single text attribute (the ancestry string)
//! - **Property map**: columns are entries in a JSON object, so the ancestry
//!   and depth-cache columns can sit under configurable names
//! - **Change tracking**: a snapshot of the properties as last persisted
//!   drives `is_new` / `is_changed` / `attribute_was`
//!
//! # Examples
//!
//! ```rust
//! use treeline_core::models::Node;
//! use serde_json::json;
//!
//! let mut node = Node::new();
//! node.set_text_attribute("ancestry", Some("1/2".to_string()));
//! node.set_attribute("label", json!("a leaf"));
//!
//! assert!(node.is_new());
//! assert!(node.is_changed("ancestry"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Primary key of a node.
///
/// Lineage encodings reference nodes by key, and backing tables key records
/// either by integer or by string. The codec decides which variant to produce
/// at each parse site (see `TreeConfig::primary_key_type`), so nothing in the
/// tree layer assumes integer keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(n) => write!(f, "{}", n),
            NodeId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId::Int(n)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::Str(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::Str(s)
    }
}

/// Structural validation errors for a node's lineage attribute.
///
/// These are recoverable, user-facing errors: the surrounding save flow
/// collects them into a [`ValidationReport`] and refuses to persist the
/// record, rather than panicking or corrupting descendants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Ancestry string fails the `branch(,branch)*` grammar
    #[error("invalid ancestry value: {value:?}")]
    InvalidGrammar { value: String },

    /// Node's own id appears in its ancestry
    #[error("record cannot be a descendant of itself")]
    SelfAncestry,
}

impl ValidationError {
    /// Create an invalid grammar error
    pub fn invalid_grammar(value: impl Into<String>) -> Self {
        Self::InvalidGrammar {
            value: value.into(),
        }
    }
}

/// Accumulated structural violations for one record.
///
/// Validation is advisory: callers can inspect the report without an error
/// being raised, and the save flow turns a non-empty report into a hard
/// failure before any write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a structural error against the record
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
            first = false;
        }
        Ok(())
    }
}

impl From<ValidationError> for ValidationReport {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Flat record with a configurable set of attributes.
///
/// # Fields
///
/// - `id`: primary key, assigned by the store on create (`None` until then)
/// - `properties`: all column values, keyed by column name; the ancestry
///   string and the optional depth cache live here under configured names
/// - `created_at` / `modified_at`: timestamps
///
/// A second, non-serialized copy of the properties records the state as last
/// persisted. Reparent propagation needs the pre-mutation ancestry value
/// (`attribute_was`), and the save flow needs to know whether the ancestry
/// attribute changed at all (`is_changed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Primary key, `None` for records that were never persisted
    pub id: Option<NodeId>,

    /// Column values keyed by column name
    pub properties: Map<String, Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,

    /// Properties as last persisted; `None` means the record is new
    #[serde(skip)]
    persisted: Option<Map<String, Value>>,
}

impl Node {
    /// Create a new, unpersisted node with no attributes set
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: None,
            properties: Map::new(),
            created_at: now,
            modified_at: now,
            persisted: None,
        }
    }

    /// Create a new, unpersisted node with initial attributes
    pub fn with_properties(properties: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            properties,
            created_at: now,
            modified_at: now,
            persisted: None,
        }
    }

    /// Current value of an attribute
    pub fn attribute(&self, column: &str) -> Option<&Value> {
        self.properties.get(column)
    }

    /// Value of an attribute as last persisted
    ///
    /// For a new record there is no persisted state and this returns `None`
    /// for every column.
    pub fn attribute_was(&self, column: &str) -> Option<&Value> {
        self.persisted.as_ref().and_then(|p| p.get(column))
    }

    /// Set an attribute, bumping the modification timestamp
    pub fn set_attribute(&mut self, column: &str, value: Value) {
        self.properties.insert(column.to_string(), value);
        self.modified_at = Utc::now();
    }

    /// Current value of a text attribute
    ///
    /// A JSON `null` reads as `None`, matching a NULL column.
    pub fn text_attribute(&self, column: &str) -> Option<&str> {
        self.attribute(column).and_then(Value::as_str)
    }

    /// Text attribute as last persisted
    pub fn text_attribute_was(&self, column: &str) -> Option<&str> {
        self.attribute_was(column).and_then(Value::as_str)
    }

    /// Set a text attribute; `None` stores a NULL
    pub fn set_text_attribute(&mut self, column: &str, value: Option<String>) {
        let value = value.map(Value::String).unwrap_or(Value::Null);
        self.set_attribute(column, value);
    }

    /// Current value of a numeric attribute
    pub fn int_attribute(&self, column: &str) -> Option<i64> {
        self.attribute(column).and_then(Value::as_i64)
    }

    /// Set a numeric attribute; `None` stores a NULL
    pub fn set_int_attribute(&mut self, column: &str, value: Option<i64>) {
        let value = value.map(Value::from).unwrap_or(Value::Null);
        self.set_attribute(column, value);
    }

    /// Whether the record was never persisted
    pub fn is_new(&self) -> bool {
        self.persisted.is_none()
    }

    /// Whether an attribute differs from its last persisted value
    ///
    /// Every attribute of a new record counts as changed.
    pub fn is_changed(&self, column: &str) -> bool {
        match &self.persisted {
            None => true,
            Some(persisted) => {
                normalized(persisted.get(column)) != normalized(self.properties.get(column))
            }
        }
    }

    /// Snapshot the current properties as the persisted state
    ///
    /// Called by stores after a successful write; after this, `is_changed`
    /// reports false for every column until the next mutation.
    pub fn mark_persisted(&mut self) {
        self.persisted = Some(self.properties.clone());
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

// A missing key and an explicit NULL are the same column state.
fn normalized(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Null) | None => None,
        other => other,
    }
}
