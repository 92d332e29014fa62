//! In-memory implementation of PivotStore
//!
//! This module provides a HashMap-based pivot store for testing and as a
//! reference implementation of the ordering contract. Batched writes are
//! atomic by default; fault injection lets tests exercise store failures.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dragsort_core::{Dragable, PivotStore, Relation, StorageError, StorageResult};

/// In-memory pivot storage using HashMaps.
///
/// This is a lightweight, non-persistent store useful for:
/// - Unit and property-based testing of the ordering algorithm
/// - The scenario runner binary
/// - Reference implementation for documentation
///
/// # Example
///
/// ```rust,no_run
/// use dragsort::{DefaultPivot, MemoryPivotStore};
/// use dragsort_core::{AttachMethod, DragOperations, Position, Relation};
///
/// async fn example() -> anyhow::Result<()> {
///     let store: MemoryPivotStore<DefaultPivot, String> = MemoryPivotStore::new();
///     let relation = Relation::new("playlist", "p1".to_string());
///
///     store.upsert_member("song-a".to_string(), "Song A".to_string())?;
///     store
///         .attach(
///             &relation,
///             DefaultPivot::new("p1", "song-a"),
///             AttachMethod::IfNotExists,
///             Position::End,
///         )
///         .await?;
///
///     assert_eq!(store.get_sorted(&relation).await?, vec!["Song A".to_string()]);
///     Ok(())
/// }
/// ```
pub struct MemoryPivotStore<P: Dragable, M> {
    state: Arc<RwLock<MemoryState<P, M>>>,
    atomic_batches: bool,
}

impl<P: Dragable, M> Clone for MemoryPivotStore<P, M> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            atomic_batches: self.atomic_batches,
        }
    }
}

struct MemoryState<P: Dragable, M> {
    /// Pivots per relation, in insertion order
    pivots: HashMap<Relation<P::OwnerId>, Vec<StoredPivot<P>>>,
    /// Far-side members by id
    members: HashMap<P::MemberId, M>,
    /// Insertion counter used to break sort value ties deterministically
    next_seq: u64,
    /// Number of successful pivot writes (inserts and updates)
    write_count: u64,
    /// Members whose pivot writes fail with a backend error
    failing_members: HashSet<P::MemberId>,
}

impl<P: Dragable, M> Default for MemoryState<P, M> {
    fn default() -> Self {
        Self {
            pivots: HashMap::new(),
            members: HashMap::new(),
            next_seq: 0,
            write_count: 0,
            failing_members: HashSet::new(),
        }
    }
}

#[derive(Clone)]
struct StoredPivot<P> {
    seq: u64,
    pivot: P,
}

fn check_owner<P: Dragable>(relation: &Relation<P::OwnerId>, pivot: &P) -> StorageResult<()> {
    if relation.owner_id() != Some(pivot.owner_id()) {
        return Err(StorageError::OwnerMismatch {
            relation: relation.to_string(),
            member_id: pivot.member_id().to_string(),
            pivot_owner: pivot.owner_id().to_string(),
        });
    }
    Ok(())
}

impl<P: Dragable, M> MemoryState<P, M> {
    /// Pivots of a relation ordered by (sort value, insertion order).
    fn sorted(&self, relation: &Relation<P::OwnerId>) -> Vec<&StoredPivot<P>> {
        let mut pivots: Vec<&StoredPivot<P>> = self
            .pivots
            .get(relation)
            .map(|p| p.iter().collect())
            .unwrap_or_default();
        pivots.sort_by_key(|p| (p.pivot.sort_value(), p.seq));
        pivots
    }

    fn check_writable(&self, relation: &Relation<P::OwnerId>, pivot: &P) -> StorageResult<()> {
        check_owner(relation, pivot)?;
        if self.failing_members.contains(pivot.member_id()) {
            return Err(StorageError::BackendError(format!(
                "injected write failure for {}",
                pivot.member_id()
            )));
        }
        let exists = self
            .pivots
            .get(relation)
            .is_some_and(|p| p.iter().any(|s| s.pivot.member_id() == pivot.member_id()));
        if !exists {
            return Err(StorageError::NotFound {
                relation: relation.name().to_string(),
                member_id: pivot.member_id().to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, relation: &Relation<P::OwnerId>, pivot: &P) {
        if let Some(stored) = self.pivots.get_mut(relation).and_then(|p| {
            p.iter_mut()
                .find(|s| s.pivot.member_id() == pivot.member_id())
        }) {
            stored.pivot = pivot.clone();
            self.write_count += 1;
        }
    }
}

impl<P: Dragable, M> Default for MemoryPivotStore<P, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Dragable, M> MemoryPivotStore<P, M> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            atomic_batches: true,
        }
    }

    /// Choose between an all-or-nothing `persist_all` (default) and the
    /// best-effort concurrent batch that leaves earlier writes in place.
    pub fn with_atomic_batches(mut self, atomic_batches: bool) -> Self {
        self.atomic_batches = atomic_batches;
        self
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, MemoryState<P, M>>> {
        self.state
            .read()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, MemoryState<P, M>>> {
        self.state
            .write()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))
    }

    /// Register or replace a far-side member.
    pub fn upsert_member(&self, member_id: P::MemberId, member: M) -> StorageResult<()> {
        let mut state = self.write()?;
        state.members.insert(member_id, member);
        Ok(())
    }

    /// Insert a pivot with its sort value untouched.
    ///
    /// Bypasses allocation; used to seed fixtures, including conflicting ones.
    pub fn seed_pivot(&self, relation: &Relation<P::OwnerId>, pivot: P) -> StorageResult<()> {
        check_owner(relation, &pivot)?;
        let mut state = self.write()?;
        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .pivots
            .entry(relation.clone())
            .or_default()
            .push(StoredPivot { seq, pivot });
        Ok(())
    }

    /// Remove the pivot attaching `member_id`. Returns false if there was none.
    pub fn detach(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
    ) -> StorageResult<bool> {
        let mut state = self.write()?;
        let Some(pivots) = state.pivots.get_mut(relation) else {
            return Ok(false);
        };
        let before = pivots.len();
        pivots.retain(|s| s.pivot.member_id() != member_id);
        Ok(pivots.len() != before)
    }

    /// Sort values of the relation as (member id, sort value), ascending.
    pub fn sort_values(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> StorageResult<Vec<(P::MemberId, i64)>> {
        let state = self.read()?;
        Ok(state
            .sorted(relation)
            .into_iter()
            .map(|s| (s.pivot.member_id().clone(), s.pivot.sort_value()))
            .collect())
    }

    /// Make every write of `member_id`'s pivot fail.
    pub fn fail_writes_for(&self, member_id: P::MemberId) -> StorageResult<()> {
        let mut state = self.write()?;
        state.failing_members.insert(member_id);
        Ok(())
    }

    pub fn clear_failures(&self) -> StorageResult<()> {
        let mut state = self.write()?;
        state.failing_members.clear();
        Ok(())
    }

    /// Count of successful pivot writes since creation.
    pub fn write_count(&self) -> StorageResult<u64> {
        Ok(self.read()?.write_count)
    }
}

#[async_trait]
impl<P, M> PivotStore<P> for MemoryPivotStore<P, M>
where
    P: Dragable,
    M: Clone + Send + Sync + 'static,
{
    type Member = M;

    async fn find_pivot_by_member_id(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
    ) -> StorageResult<Option<P>> {
        let state = self.read()?;
        Ok(state
            .pivots
            .get(relation)
            .and_then(|p| p.iter().find(|s| s.pivot.member_id() == member_id))
            .map(|s| s.pivot.clone()))
    }

    async fn find_pivot_by_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
        sort_value: i64,
    ) -> StorageResult<Option<P>> {
        let state = self.read()?;
        Ok(state
            .pivots
            .get(relation)
            .and_then(|p| p.iter().find(|s| s.pivot.sort_value() == sort_value))
            .map(|s| s.pivot.clone()))
    }

    // No cache to bypass: every read sees the latest state.
    async fn all_pivots(
        &self,
        relation: &Relation<P::OwnerId>,
        _force_reload: bool,
    ) -> StorageResult<Vec<P>> {
        let state = self.read()?;
        Ok(state
            .sorted(relation)
            .into_iter()
            .map(|s| s.pivot.clone())
            .collect())
    }

    async fn max_sort_value_pivot(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> StorageResult<Option<P>> {
        let state = self.read()?;
        Ok(state
            .sorted(relation)
            .last()
            .map(|s| s.pivot.clone()))
    }

    async fn persist(&self, relation: &Relation<P::OwnerId>, pivot: &P) -> StorageResult<()> {
        let mut state = self.write()?;
        state.check_writable(relation, pivot)?;
        state.apply(relation, pivot);
        Ok(())
    }

    async fn persist_all(
        &self,
        relation: &Relation<P::OwnerId>,
        pivots: &[P],
    ) -> StorageResult<()> {
        if !self.atomic_batches {
            try_join_all(pivots.iter().map(|pivot| self.persist(relation, pivot))).await?;
            return Ok(());
        }

        let mut state = self.write()?;
        for pivot in pivots {
            state.check_writable(relation, pivot)?;
        }
        for pivot in pivots {
            state.apply(relation, pivot);
        }
        Ok(())
    }

    async fn insert_pivot(&self, relation: &Relation<P::OwnerId>, pivot: P) -> StorageResult<()> {
        check_owner(relation, &pivot)?;
        let mut state = self.write()?;
        if state.failing_members.contains(pivot.member_id()) {
            return Err(StorageError::BackendError(format!(
                "injected write failure for {}",
                pivot.member_id()
            )));
        }
        let duplicate = state
            .pivots
            .get(relation)
            .is_some_and(|p| p.iter().any(|s| s.pivot.member_id() == pivot.member_id()));
        if duplicate {
            return Err(StorageError::DuplicatePivot {
                relation: relation.name().to_string(),
                member_id: pivot.member_id().to_string(),
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.write_count += 1;
        state
            .pivots
            .entry(relation.clone())
            .or_default()
            .push(StoredPivot { seq, pivot });
        Ok(())
    }

    async fn members_ordered_by_sort_value(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> StorageResult<Vec<M>> {
        let state = self.read()?;
        Ok(state
            .sorted(relation)
            .into_iter()
            .filter_map(|s| state.members.get(s.pivot.member_id()).cloned())
            .collect())
    }
}
