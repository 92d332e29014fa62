//! Pivot record type used by the in-memory store and the scenario runner

use dragsort_core::Dragable;
use serde::{Deserialize, Serialize};

/// Join record between an owner and a member, keyed by string ids.
///
/// The sort value range is fixed per type through the const parameters, so
/// relations with different tunables use different instantiations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingPivot<const MAX: i64, const STEP: i64> {
    pub owner_id: String,
    pub member_id: String,
    pub sort_value: i64,
}

/// Full `i64` range with `2^32` between appended members: 2^31 appends before
/// the tail saturates, and about 32 halvings per gap before a rebalance.
pub type DefaultPivot = SiblingPivot<{ i64::MAX }, { 1 << 32 }>;

impl<const MAX: i64, const STEP: i64> SiblingPivot<MAX, STEP> {
    /// New pivot; the sort value is assigned on attach.
    pub fn new(owner_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            member_id: member_id.into(),
            sort_value: 0,
        }
    }

    pub fn with_sort_value(mut self, sort_value: i64) -> Self {
        self.sort_value = sort_value;
        self
    }
}

impl<const MAX: i64, const STEP: i64> Dragable for SiblingPivot<MAX, STEP> {
    type OwnerId = String;
    type MemberId = String;

    const MAX_SORT_VALUE: i64 = MAX;
    const INSERT_STEP: i64 = STEP;

    fn owner_id(&self) -> &String {
        &self.owner_id
    }

    fn member_id(&self) -> &String {
        &self.member_id
    }

    fn sort_value(&self) -> i64 {
        self.sort_value
    }

    fn set_sort_value(&mut self, sort_value: i64) {
        self.sort_value = sort_value;
    }
}
