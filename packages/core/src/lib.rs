//! Treeline Core - Materialized-Path Trees over Flat Records
//!
//! This crate keeps tree (and bounded multi-parent forest) structure for
//! records stored in a flat table, encoding each record's full lineage in a
//! single text attribute — the *ancestry string* — instead of adjacency
//! pointers or a closure table.
//!
//! # Architecture
//!
//! - **One column**: `"1/4/30"` means root 1, then 4, parent 30; commas
//!   separate independent parent chains
//! - **Derived, never stored**: ancestors, parents, root, depth, path, and
//!   descendant sets are all recomputed from the string
//! - **Storage-agnostic**: the record store is an abstract async trait; the
//!   descendant matcher hands it predicates, not SQL
//! - **Consistent subtrees**: reparenting rewrites every descendant's prefix
//!   in one pass; deletion resolves orphans by configurable strategy
//!
//! # Modules
//!
//! - [`models`] - records, the ancestry codec, lineage derivations, config
//! - [`db`] - store trait, query predicates, in-memory store
//! - [`services`] - the tree service (save/destroy flows and scopes)

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, MemoryStore, NodeFilter, NodeStore};
pub use models::{Ancestry, Node, NodeId, OrphanStrategy, PrimaryKeyType, TreeConfig};
pub use services::{TreeError, TreeService};
