//! Tree Services
//!
//! The orchestration layer over the record store:
//!
//! - `TreeService` - validation, reparent propagation, orphan resolution,
//!   and all lineage read operations
//!
//! The service coordinates between the codec/deriver in `models` and the
//! store boundary in `db`, one mutation at a time.

pub mod error;
pub mod tree_service;

pub use error::TreeError;
pub use tree_service::{DepthOptions, TreeService};
