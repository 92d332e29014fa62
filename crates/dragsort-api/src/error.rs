use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relation::Position;

/// Errors raised by pivot stores.
///
/// The ordering layer never translates these; they surface to callers
/// through `SortError::Storage` unchanged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Pivot not found in relation {relation}: member {member_id}")]
    NotFound { relation: String, member_id: String },

    #[error("Pivot already exists in relation {relation}: member {member_id}")]
    DuplicatePivot { relation: String, member_id: String },

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Pivot for member {member_id} belongs to owner {pivot_owner}, not {relation}")]
    OwnerMismatch {
        relation: String,
        member_id: String,
        pivot_owner: String,
    },
}

/// Structured error types for ordering operations.
///
/// `PivotNotFound` and `NoSortValueAvailable` are the two expected failure
/// paths: a stale member id, or a key space that is still saturated after a
/// rebalance.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("No pivot found when searching for member {member_id}")]
    PivotNotFound { member_id: String },

    #[error("No sort value available after resolving conflicts")]
    NoSortValueAvailable,

    #[error("Cannot query siblings relation {relation} from unsaved owner")]
    UnsavedOwner { relation: String },

    #[error("Attach position {position} is not supported")]
    UnsupportedPosition { position: Position },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Serializable summary of a `SortError`, for frontends and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SortErrorReport {
    PivotNotFound { member_id: String },
    NoSortValueAvailable,
    UnsavedOwner { relation: String },
    UnsupportedPosition { position: Position },
    Storage { message: String },
}

impl From<&SortError> for SortErrorReport {
    fn from(err: &SortError) -> Self {
        match err {
            SortError::PivotNotFound { member_id } => SortErrorReport::PivotNotFound {
                member_id: member_id.clone(),
            },
            SortError::NoSortValueAvailable => SortErrorReport::NoSortValueAvailable,
            SortError::UnsavedOwner { relation } => SortErrorReport::UnsavedOwner {
                relation: relation.clone(),
            },
            SortError::UnsupportedPosition { position } => {
                SortErrorReport::UnsupportedPosition { position: *position }
            }
            SortError::Storage(e) => SortErrorReport::Storage {
                message: e.to_string(),
            },
        }
    }
}
