//! In-memory RecordStore implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rules_core::{ActorId, ActorRecord, ActorUpdate, ItemUpdate, OwnedItem};

use super::error::{Result, StoreError};
use super::traits::{RecordStore, apply_item_batch};

/// In-memory implementation of [`RecordStore`].
///
/// Counts every write call so tests can assert on the number of persistence
/// round trips an operation issued.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<ActorId, ActorRecord>>,
    record_writes: AtomicUsize,
    item_writes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records.
    pub fn with_records(records: impl IntoIterator<Item = ActorRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Insert or replace a record. Not counted as a write.
    pub fn insert(&self, record: ActorRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Number of `update_record` calls so far.
    pub fn record_writes(&self) -> usize {
        self.record_writes.load(Ordering::SeqCst)
    }

    /// Number of `update_items` calls so far.
    pub fn item_writes(&self) -> usize {
        self.item_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn load(&self, id: &ActorId) -> Result<ActorRecord> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update_record(&self, id: &ActorId, update: &ActorUpdate) -> Result<ActorRecord> {
        self.record_writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        record.apply_update(update);
        Ok(record.clone())
    }

    async fn update_items(&self, id: &ActorId, updates: &[ItemUpdate]) -> Result<Vec<OwnedItem>> {
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        apply_item_batch(record, updates)
    }
}
