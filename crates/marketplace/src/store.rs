use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use giftmarket_core::{DomainError, DomainResult, Entity};

/// In-memory entity store for dev/tests.
///
/// Keyed by id; ids are time-ordered so `list` returns records in creation
/// order. Read-modify-write goes through `update` so concurrent requests
/// cannot lose each other's changes.
#[derive(Debug)]
pub struct InMemoryStore<E: Entity> {
    inner: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, id: &E::Id) -> DomainResult<E> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(id).cloned().ok_or(DomainError::not_found(E::KIND))
    }

    pub fn insert(&self, entity: E) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(entity.id(), entity);
    }

    pub fn list(&self) -> Vec<E> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().cloned().collect()
    }

    pub fn list_where(&self, mut pred: impl FnMut(&E) -> bool) -> Vec<E> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|e| pred(e)).cloned().collect()
    }

    /// Mutate one record under the write lock.
    ///
    /// `f` works on a copy; the stored record only changes if `f` succeeds.
    pub fn update<R, Err>(&self, id: &E::Id, f: impl FnOnce(&mut E) -> Result<R, Err>) -> Result<(E, R), Err>
    where
        Err: From<DomainError>,
    {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let current = map.get(id).ok_or(DomainError::not_found(E::KIND))?;
        let mut next = current.clone();
        let out = f(&mut next)?;
        map.insert(*id, next.clone());
        Ok((next, out))
    }

    /// Like `update`, for the first record matching `pred`.
    pub fn update_first<R, Err>(
        &self,
        mut pred: impl FnMut(&E) -> bool,
        f: impl FnOnce(&mut E) -> Result<R, Err>,
    ) -> Result<(E, R), Err>
    where
        Err: From<DomainError>,
    {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let current = map
            .values()
            .find(|e| pred(e))
            .ok_or(DomainError::not_found(E::KIND))?;
        let mut next = current.clone();
        let out = f(&mut next)?;
        map.insert(next.id(), next.clone());
        Ok((next, out))
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftmarket_core::UserId;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        id: UserId,
        n: u32,
    }

    impl Entity for Counter {
        type Id = UserId;
        const KIND: &'static str = "counter";

        fn id(&self) -> UserId {
            self.id
        }
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let store = InMemoryStore::new();
        let id = UserId::new();
        store.insert(Counter { id, n: 1 });

        let err = store
            .update(&id, |c| {
                c.n = 99;
                Err::<(), _>(DomainError::invariant("nope"))
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(store.get(&id).unwrap().n, 1);

        let (after, ()) = store
            .update(&id, |c| {
                c.n += 1;
                Ok::<(), DomainError>(())
            })
            .unwrap();
        assert_eq!(after.n, 2);
    }

    #[test]
    fn missing_record_reports_its_kind() {
        let store: InMemoryStore<Counter> = InMemoryStore::new();
        assert_eq!(store.get(&UserId::new()), Err(DomainError::NotFound("counter")));
    }
}
