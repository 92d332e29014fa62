//! Core ordering traits
//!
//! This module provides the traits for drag-and-drop ordering:
//! - `Dragable`: capability set a pivot record type exposes
//! - `PivotStore`: persistence collaborator that owns all state
//! - `DragOperations`: the order-key allocator, provided for every `PivotStore`

use async_trait::async_trait;
use futures::future::try_join_all;
use std::fmt;
use std::hash::Hash;

use crate::sort_value::{gen_append, gen_between, gen_n_sort_values, is_in_range};
use dragsort_api::{AttachMethod, Position, Relation, Result, SortError, StorageError};

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// Define MaybeSendSync trait alias for WASM compatibility
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Identifier bounds shared by owner and member ids.
pub trait RecordId: Clone + Eq + Hash + fmt::Debug + fmt::Display + MaybeSendSync + 'static {}
impl<T> RecordId for T where
    T: Clone + Eq + Hash + fmt::Debug + fmt::Display + MaybeSendSync + 'static
{
}

/// Pivot records that carry a sort value
///
/// The range constants are type-level: every relation using the same pivot
/// type shares them.
pub trait Dragable: Clone + MaybeSendSync + 'static {
    type OwnerId: RecordId;
    type MemberId: RecordId;

    /// Largest legal sort value (inclusive).
    const MAX_SORT_VALUE: i64;
    /// Distance between consecutive appended members.
    const INSERT_STEP: i64;

    /// Identifier of the owner side; must match the relation's owner.
    fn owner_id(&self) -> &Self::OwnerId;

    /// Identifier of the far-side member this pivot attaches.
    fn member_id(&self) -> &Self::MemberId;

    fn sort_value(&self) -> i64;
    fn set_sort_value(&mut self, sort_value: i64);
}

/// Persistence collaborator for pivot records
///
/// Implementations scope every call to the given relation. `all_pivots` must
/// return records in ascending sort value order (ties in a stable order), so
/// that rebalancing preserves what the user sees.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PivotStore<P>: MaybeSendSync
where
    P: Dragable,
{
    /// Far-side entity returned by `members_ordered_by_sort_value`.
    type Member: MaybeSendSync;

    async fn find_pivot_by_member_id(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
    ) -> StorageResult<Option<P>>;

    /// First pivot holding exactly `sort_value`, if any.
    async fn find_pivot_by_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
        sort_value: i64,
    ) -> StorageResult<Option<P>>;

    /// All pivots of the relation; `force_reload` bypasses any cache.
    async fn all_pivots(
        &self,
        relation: &Relation<P::OwnerId>,
        force_reload: bool,
    ) -> StorageResult<Vec<P>>;

    /// Pivot with the greatest sort value.
    async fn max_sort_value_pivot(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> StorageResult<Option<P>>;

    /// Write back the sort value of an existing pivot.
    async fn persist(&self, relation: &Relation<P::OwnerId>, pivot: &P) -> StorageResult<()>;

    /// Write back a batch of pivots.
    ///
    /// The default issues every write concurrently and waits for all of them.
    /// Writes that completed before a failure are not rolled back; stores
    /// with transactions should override this with an atomic batch.
    async fn persist_all(
        &self,
        relation: &Relation<P::OwnerId>,
        pivots: &[P],
    ) -> StorageResult<()> {
        try_join_all(pivots.iter().map(|pivot| self.persist(relation, pivot))).await?;
        Ok(())
    }

    /// Insert a new pivot (attach).
    async fn insert_pivot(&self, relation: &Relation<P::OwnerId>, pivot: P) -> StorageResult<()>;

    /// Members joined through their pivots, ascending by sort value.
    async fn members_ordered_by_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> StorageResult<Vec<Self::Member>>;
}

/// Drag-and-drop ordering operations
///
/// Stateless: every method reads and writes through the `PivotStore`. No lock
/// is held across the read-validate-write sequence; callers that need strict
/// consistency under concurrency must serialize calls per relation.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DragOperations<P>: PivotStore<P>
where
    P: Dragable,
{
    /// Pivot attaching `member_id` to the relation.
    async fn pivot_by_id(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
    ) -> Result<Option<P>> {
        relation.require_owner()?;
        Ok(self.find_pivot_by_member_id(relation, member_id).await?)
    }

    /// Current sort value of a member (None if the id is None or not attached).
    async fn sort_value_of(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: Option<&P::MemberId>,
    ) -> Result<Option<i64>> {
        let Some(member_id) = member_id else {
            return Ok(None);
        };
        let pivot = self.pivot_by_id(relation, member_id).await?;
        Ok(pivot.map(|p| p.sort_value()))
    }

    /// Greatest sort value in the relation (None if it is empty).
    async fn max_sort_value(&self, relation: &Relation<P::OwnerId>) -> Result<Option<i64>> {
        relation.require_owner()?;
        let last = self.max_sort_value_pivot(relation).await?;
        Ok(last.map(|p| p.sort_value()))
    }

    /// Generate a candidate sort value placing a member between neighbours
    ///
    /// # Parameters
    /// * `before` - Member that should end up immediately preceding
    /// * `after` - Member that should end up immediately following
    ///
    /// Neither set (or neither found) means append. The result is not
    /// validated.
    async fn generate_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
        before: Option<&P::MemberId>,
        after: Option<&P::MemberId>,
    ) -> Result<i64> {
        let before_value = self.sort_value_of(relation, before).await?;
        let after_value = self.sort_value_of(relation, after).await?;

        let candidate = match gen_between(before_value, after_value, P::MAX_SORT_VALUE) {
            Some(value) => value,
            None => {
                let current_max = self.max_sort_value(relation).await?;
                gen_append(current_max, P::MAX_SORT_VALUE, P::INSERT_STEP)
            }
        };

        tracing::debug!(
            "[DragOperations] {} candidate {} (before={:?}, after={:?})",
            relation.name(),
            candidate,
            before_value,
            after_value
        );
        Ok(candidate)
    }

    /// Whether some pivot in the relation already holds `sort_value`.
    async fn is_conflict(&self, relation: &Relation<P::OwnerId>, sort_value: i64) -> Result<bool> {
        relation.require_owner()?;
        let existing = self.find_pivot_by_sort_value(relation, sort_value).await?;
        Ok(existing.is_some())
    }

    async fn is_sort_value_valid(
        &self,
        relation: &Relation<P::OwnerId>,
        sort_value: i64,
    ) -> Result<bool> {
        Ok(!self.is_conflict(relation, sort_value).await?
            && is_in_range(sort_value, P::MAX_SORT_VALUE))
    }

    /// Respread every pivot of the relation evenly over `[0, MAX_SORT_VALUE)`.
    ///
    /// Pivots keep the order in which `all_pivots` returns them.
    async fn resolve_conflict(&self, relation: &Relation<P::OwnerId>) -> Result<()> {
        relation.require_owner()?;
        let mut pivots = self.all_pivots(relation, true).await?;
        if pivots.is_empty() {
            return Ok(());
        }

        let values = gen_n_sort_values(pivots.len(), P::MAX_SORT_VALUE);
        for (pivot, value) in pivots.iter_mut().zip(values) {
            pivot.set_sort_value(value);
        }

        tracing::info!(
            "[DragOperations] Rebalancing {} pivots in {}",
            pivots.len(),
            relation.name()
        );
        self.persist_all(relation, &pivots).await?;
        Ok(())
    }

    /// Next valid sort value for the given neighbours
    ///
    /// Rebalances at most once. Fails with `NoSortValueAvailable` if the
    /// second candidate is still taken or out of range.
    async fn next_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
        before: Option<&P::MemberId>,
        after: Option<&P::MemberId>,
    ) -> Result<i64> {
        let mut next = self.generate_sort_value(relation, before, after).await?;

        if !self.is_sort_value_valid(relation, next).await? {
            tracing::warn!(
                "[DragOperations] Sort value {} unavailable in {}, resolving conflict",
                next,
                relation.name()
            );
            self.resolve_conflict(relation).await?;
            next = self.generate_sort_value(relation, before, after).await?;
        }

        if !self.is_sort_value_valid(relation, next).await? {
            tracing::warn!(
                "[DragOperations] Sort values exhausted in {} after rebalancing",
                relation.name()
            );
            return Err(SortError::NoSortValueAvailable);
        }
        Ok(next)
    }

    /// Sort value for a newly attached member (appended at the end).
    async fn init_sort_value(&self, relation: &Relation<P::OwnerId>) -> Result<i64> {
        self.next_sort_value(relation, None, None).await
    }

    /// Move a member between `before` and `after`
    ///
    /// Only the moved pivot is written, unless a rebalance was needed.
    /// Returns the member's new sort value.
    async fn move_member(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
        before: Option<&P::MemberId>,
        after: Option<&P::MemberId>,
    ) -> Result<i64> {
        let mut pivot = self
            .pivot_by_id(relation, member_id)
            .await?
            .ok_or_else(|| SortError::PivotNotFound {
                member_id: member_id.to_string(),
            })?;

        let next = self.next_sort_value(relation, before, after).await?;
        pivot.set_sort_value(next);
        self.persist(relation, &pivot).await?;
        Ok(next)
    }

    /// Attach a new pivot with a freshly allocated sort value
    ///
    /// Returns the assigned sort value, or None when `method` is
    /// `IfNotExists` and the member is already attached.
    /// `Position::Beginning` is rejected with `UnsupportedPosition`.
    async fn attach(
        &self,
        relation: &Relation<P::OwnerId>,
        mut pivot: P,
        method: AttachMethod,
        position: Position,
    ) -> Result<Option<i64>> {
        relation.require_owner()?;
        if position != Position::End {
            return Err(SortError::UnsupportedPosition { position });
        }

        if method == AttachMethod::IfNotExists
            && self
                .find_pivot_by_member_id(relation, pivot.member_id())
                .await?
                .is_some()
        {
            tracing::debug!(
                "[DragOperations] {} already attached to {}",
                pivot.member_id(),
                relation.name()
            );
            return Ok(None);
        }

        let sort_value = self.init_sort_value(relation).await?;
        pivot.set_sort_value(sort_value);
        self.insert_pivot(relation, pivot).await?;
        Ok(Some(sort_value))
    }

    /// Members of the relation ordered by sort value.
    async fn get_sorted(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> Result<Vec<<Self as PivotStore<P>>::Member>> {
        relation.require_owner()?;
        Ok(self.members_ordered_by_sort_value(relation).await?)
    }
}

// Blanket implementation: every PivotStore gets the ordering operations
impl<P, S> DragOperations<P> for S
where
    P: Dragable,
    S: PivotStore<P> + ?Sized,
{
    // All methods have default implementations in the trait, so nothing to implement here
}
