//! Ordering handle with optional per-relation serialization
//!
//! `DragOperations` takes no locks. `SiblingOrdering` wraps a store and, when
//! `OrderingConfig::serialize_per_relation` is set, holds an async mutex keyed
//! by the relation for the whole read-validate-write sequence of each
//! mutating call.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

use crate::config::OrderingConfig;
use dragsort_core::{
    AttachMethod, DragOperations, Dragable, PivotStore, Position, Relation, Result,
};

type LockMap<K> = HashMap<K, Arc<tokio::sync::Mutex<()>>>;

/// Application-level mutexes keyed by relation identity.
///
/// An entry lives only while some caller holds or waits for its lock.
pub struct RelationLocks<K> {
    locks: Arc<Mutex<LockMap<K>>>,
}

impl<K> Default for RelationLocks<K> {
    fn default() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> RelationLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &K) -> RelationGuard<K> {
        let lock = {
            // The map only hands out Arcs, so a poisoned map is still consistent.
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        RelationGuard {
            guard: Some(lock.lock_owned().await),
            key: key.clone(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of relations currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one relation; removes the map entry on drop when no
/// other caller references it.
pub struct RelationGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: Arc<Mutex<LockMap<K>>>,
}

impl<K: Eq + Hash> Drop for RelationGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // New clones are only made under the map lock, so a count of one
        // means nobody else holds or awaits this mutex.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Reorder entry point used by frontends
///
/// Delegates to `DragOperations` on the wrapped store. Reads (`get_sorted`)
/// never take the relation lock.
pub struct SiblingOrdering<S, P>
where
    P: Dragable,
{
    store: Arc<S>,
    locks: Option<RelationLocks<Relation<P::OwnerId>>>,
    _pivot: PhantomData<fn() -> P>,
}

impl<S, P> SiblingOrdering<S, P>
where
    P: Dragable,
    S: PivotStore<P>,
{
    pub fn new(store: Arc<S>, config: &OrderingConfig) -> Self {
        let locks = config.serialize_per_relation.then(RelationLocks::new);
        Self {
            store,
            locks,
            _pivot: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn is_serialized(&self) -> bool {
        self.locks.is_some()
    }

    async fn guard(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> Option<RelationGuard<Relation<P::OwnerId>>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(relation).await),
            None => None,
        }
    }

    /// Move `member_id` between `before` and `after`; returns its new sort value.
    pub async fn move_member(
        &self,
        relation: &Relation<P::OwnerId>,
        member_id: &P::MemberId,
        before: Option<&P::MemberId>,
        after: Option<&P::MemberId>,
    ) -> Result<i64> {
        let _guard = self.guard(relation).await;
        let sort_value = self
            .store
            .move_member(relation, member_id, before, after)
            .await?;
        tracing::debug!(
            "[SiblingOrdering] Moved {} in {} to {}",
            member_id,
            relation.name(),
            sort_value
        );
        Ok(sort_value)
    }

    /// Attach a pivot at the end of the relation.
    pub async fn attach(
        &self,
        relation: &Relation<P::OwnerId>,
        pivot: P,
        method: AttachMethod,
        position: Position,
    ) -> Result<Option<i64>> {
        let _guard = self.guard(relation).await;
        self.store.attach(relation, pivot, method, position).await
    }

    /// Respread the whole relation.
    pub async fn resolve_conflict(&self, relation: &Relation<P::OwnerId>) -> Result<()> {
        let _guard = self.guard(relation).await;
        self.store.resolve_conflict(relation).await
    }

    pub async fn get_sorted(
        &self,
        relation: &Relation<P::OwnerId>,
    ) -> Result<Vec<<S as PivotStore<P>>::Member>> {
        self.store.get_sorted(relation).await
    }
}
