//! Order-key allocation for drag-and-drop sibling ordering
//!
//! This crate provides:
//! - `sort_value`: pure integer arithmetic for candidates and rebalancing
//! - `Dragable`: the capability set of a pivot record type
//! - `PivotStore`: the persistence collaborator
//! - `DragOperations`: generate, validate, rebalance, move, attach, get_sorted

pub mod sort_value;
pub mod traits;

pub use dragsort_api::{
    AttachMethod, Position, Relation, Result, SortError, SortErrorReport, StorageError,
};
pub use traits::{DragOperations, Dragable, MaybeSendSync, PivotStore, RecordId, StorageResult};
