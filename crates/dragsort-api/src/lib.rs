//! Shared types for drag-and-drop sibling ordering
//!
//! This crate holds the value types that cross the boundary between the
//! ordering algorithm, the pivot stores that persist it, and frontends:
//! - `Relation`: one owner's view of its many-to-many collection
//! - `Position` / `AttachMethod`: placement intent when attaching members
//! - `SortError` / `StorageError`: structured errors

pub mod error;
pub mod relation;

pub use error::{SortError, SortErrorReport, StorageError};
pub use relation::{AttachMethod, Position, Relation};

/// Result alias for ordering operations.
pub type Result<T> = std::result::Result<T, SortError>;
