//! Service Layer Error Types
//!
//! The full error taxonomy of tree operations. Grammar and self-reference
//! problems are recoverable validation failures that abort the write without
//! touching the record; everything else propagates to the caller
//! uninterpreted.

use crate::db::DatabaseError;
use crate::models::{NodeId, ValidationError, ValidationReport};
use thiserror::Error;

/// Tree operation errors
#[derive(Error, Debug)]
pub enum TreeError {
    /// Structural validation refused the write; the record was not persisted
    #[error("record validation failed: {0}")]
    ValidationFailed(ValidationReport),

    /// Tree operation on a record that was never persisted.
    ///
    /// Children cannot anchor to an unassigned id; this is a caller bug, not
    /// a recoverable validation case.
    #[error("no child ancestry for a new record; save the record before performing tree operations")]
    NewRecord,

    /// Delete refused under the restrict orphan strategy
    #[error("cannot delete node {id}: it has descendants")]
    HasDescendants { id: NodeId },

    /// Depth-bounding requested with an unrecognized option key
    #[error("unknown depth option: {key}")]
    UnknownDepthOption { key: String },

    /// Depth-bounding requested while depth caching is disabled
    #[error("depth scoping requires a cached depth column")]
    MissingDepthColumn,

    /// Record store failure, propagated unchanged
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TreeError {
    /// Create a has descendants error
    pub fn has_descendants(id: NodeId) -> Self {
        Self::HasDescendants { id }
    }

    /// Create an unknown depth option error
    pub fn unknown_depth_option(key: impl Into<String>) -> Self {
        Self::UnknownDepthOption { key: key.into() }
    }
}

impl From<ValidationError> for TreeError {
    fn from(error: ValidationError) -> Self {
        Self::ValidationFailed(error.into())
    }
}

impl From<ValidationReport> for TreeError {
    fn from(report: ValidationReport) -> Self {
        Self::ValidationFailed(report)
    }
}
