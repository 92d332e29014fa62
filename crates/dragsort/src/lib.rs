pub mod config;
pub mod logging;
pub mod ordering;
pub mod pivot;
pub mod scenario;
pub mod storage;

pub use config::OrderingConfig;
pub use ordering::{RelationGuard, RelationLocks, SiblingOrdering};
pub use pivot::{DefaultPivot, SiblingPivot};
pub use storage::MemoryPivotStore;
