//! Data Models
//!
//! Core data structures of the tree layer:
//!
//! - `Node` - flat record with property-map columns and change tracking
//! - `Ancestry` - decoded ancestry string (the codec)
//! - `lineage` - pure derivations (ancestors, parents, root, depth, path)
//! - `TreeConfig` - per-table configuration and resolved column accessors
//!
//! All tree structure is encoded in one text attribute per record; these
//! types never assume adjacency pointers or a closure table.

pub mod ancestry;
pub mod config;
pub mod lineage;
mod node;

pub use ancestry::{is_sane, Ancestry};
pub use config::{ColumnAccessor, OrphanStrategy, PrimaryKeyType, TreeConfig};
pub use node::{Node, NodeId, ValidationError, ValidationReport};
