//! Record Store Layer
//!
//! The boundary between the tree logic and whatever actually persists
//! records:
//!
//! - `NodeStore` - async trait the tree layer consumes; any backend that can
//!   create/read/update/delete records and evaluate a [`NodeFilter`] fits
//! - `NodeFilter` - abstract predicate over the ancestry column, so the core
//!   stays storage-agnostic (a SQL store translates arms to text operators,
//!   the in-memory store parse-and-compares)
//! - `MemoryStore` - process-local reference implementation
//!
//! Schema provisioning is an external concern: one text column per
//! tree-enabled table, plus an optional numeric depth-cache column. No extra
//! tables, no migrations.

mod error;
mod memory_store;
mod node_store;
pub mod predicate;

pub use error::DatabaseError;
pub use memory_store::MemoryStore;
pub use node_store::NodeStore;
pub use predicate::{DepthBound, DepthOp, NodeFilter, TextMatch};
