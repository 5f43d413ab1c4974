//! NodeStore Trait - Record Store Abstraction
//!
//! The tree layer consumes the persistent record store through this trait
//! and never depends on a concrete backend. All methods are async so both
//! embedded and network-backed stores fit behind it; the tree layer itself
//! performs one mutation at a time and treats every call as a blocking
//! suspend point.
//!
//! # Scoping
//!
//! `query_nodes` runs under whatever default scope the store applies
//! (soft-delete filtering and the like). `query_nodes_unscoped` bypasses it:
//! subtree rewrites must reach records the default scope hides, otherwise
//! filtered-out nodes would be left behind when their parent moves.
//!
//! # Atomicity
//!
//! The tree layer defines no multi-record atomicity and no retries. Callers
//! are expected to wrap whole tree operations in whatever transaction
//! boundary the backing store provides; a failure mid-propagation leaves the
//! subtree partially rewritten.

use crate::db::error::DatabaseError;
use crate::db::predicate::NodeFilter;
use crate::models::{Node, NodeId};
use async_trait::async_trait;

/// Abstraction over node persistence.
///
/// Implementations must be `Send + Sync`; the service holds the store behind
/// an `Arc` and may be used from any async context.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Persist a new record, assigning its primary key.
    ///
    /// Takes ownership of the node and returns the persisted form with the
    /// id filled in and change tracking reset.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` when the node carries an id that already exists.
    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError>;

    /// Fetch a record by primary key; `Ok(None)` when absent.
    ///
    /// Lookup by key is not subject to the default scope.
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>, DatabaseError>;

    /// Fetch a record by primary key, failing with `NotFound` when absent
    async fn find_node(&self, id: &NodeId) -> Result<Node, DatabaseError> {
        self.get_node(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(id))
    }

    /// Persist the current attributes of an existing record.
    ///
    /// On success the node's change tracking is reset in place.
    ///
    /// # Errors
    ///
    /// `UnassignedId` for a record that was never created; `NotFound` when
    /// the id no longer exists; `ConstraintViolation` on store-side refusal.
    async fn update_node(&self, node: &mut Node) -> Result<(), DatabaseError>;

    /// Delete a record by primary key. Deleting an absent record succeeds.
    async fn delete_node(&self, id: &NodeId) -> Result<(), DatabaseError>;

    /// All records matching the filter, under the store's default scope
    async fn query_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DatabaseError>;

    /// All records matching the filter, bypassing the default scope
    async fn query_nodes_unscoped(&self, filter: &NodeFilter)
        -> Result<Vec<Node>, DatabaseError>;
}
