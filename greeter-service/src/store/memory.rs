//! In-memory record store

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::{
    GreetingId, GreetingRecord, GreetingStore, NewGreeting, StoreError, StoreOperation,
    StoreResult,
};

#[derive(Debug)]
struct Inner {
    next_id: GreetingId,
    records: BTreeMap<GreetingId, GreetingRecord>,
}

/// Process-local greeting store
///
/// Records are kept in an ordered map keyed by id, so iteration order is
/// insertion order. Ids start at 1 and keep increasing across deletes.
#[derive(Debug)]
pub struct MemoryGreetingStore {
    inner: RwLock<Inner>,
}

impl MemoryGreetingStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryGreetingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GreetingStore for MemoryGreetingStore {
    async fn insert(&self, record: NewGreeting) -> StoreResult<GreetingRecord> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id = id.checked_add(1).ok_or_else(|| {
            StoreError::query_failed(StoreOperation::Insert, "Identifier space exhausted")
        })?;

        let stored = GreetingRecord {
            id,
            name: record.name,
            age: record.age,
            city: record.city,
            message: record.message,
        };
        inner.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: GreetingId) -> StoreResult<Option<GreetingRecord>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<GreetingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.values().find(|r| r.name == name).cloned())
    }

    async fn scan(&self, limit: usize) -> StoreResult<Vec<GreetingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.values().take(limit).cloned().collect())
    }

    async fn update(&self, record: &GreetingRecord) -> StoreResult<GreetingRecord> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&record.id) {
            Some(stored) => {
                stored.name.clone_from(&record.name);
                stored.age = record.age;
                stored.city.clone_from(&record.city);
                stored.message.clone_from(&record.message);
                Ok(stored.clone())
            }
            None => Err(StoreError::not_found(StoreOperation::Update, record.id)),
        }
    }

    async fn delete(&self, id: GreetingId) -> StoreResult<bool> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.records.len() as u64)
    }
}
