//! Store Error Types
//!
//! Errors surfaced by implementations of the record-store boundary. The tree
//! layer propagates these uninterpreted; it performs no retries and no
//! fallback policies of its own.

use crate::models::NodeId;
use thiserror::Error;

/// Record store operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Lookup by primary key found nothing
    #[error("node not found: {id}")]
    NotFound { id: String },

    /// Write refused by a store-side constraint (duplicate key, etc.)
    #[error("constraint violation: {context}")]
    ConstraintViolation { context: String },

    /// Write addressed to a record that was never persisted
    #[error("record has no assigned id")]
    UnassignedId,

    /// Backend-specific failure
    #[error("store operation failed: {context}")]
    Backend { context: String },
}

impl DatabaseError {
    /// Create a not found error
    pub fn not_found(id: &NodeId) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(context: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            context: context.into(),
        }
    }

    /// Create a backend failure error
    pub fn backend(context: impl Into<String>) -> Self {
        Self::Backend {
            context: context.into(),
        }
    }
}
