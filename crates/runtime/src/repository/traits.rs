//! Record store contract.

use async_trait::async_trait;
use rules_core::{ActorId, ActorRecord, ActorUpdate, ItemUpdate, OwnedItem};

use super::error::{Result, StoreError};

/// Persistence boundary for actor records.
///
/// The engine issues at most one [`update_record`](Self::update_record) and one
/// [`update_items`](Self::update_items) call per public operation; a store
/// must apply each call atomically. The pair is not a transaction: if the item
/// batch fails after the record write, the record write stands and the engine
/// logs the split. Ordering between operations on the same record is the
/// store's responsibility.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record by id.
    async fn load(&self, id: &ActorId) -> Result<ActorRecord>;

    /// Apply a record-level update and return the stored result.
    async fn update_record(&self, id: &ActorId, update: &ActorUpdate) -> Result<ActorRecord>;

    /// Apply a batch of item updates. Returns the updated items in batch order.
    ///
    /// The batch is rejected as a whole if any entry names an unknown item.
    async fn update_items(&self, id: &ActorId, updates: &[ItemUpdate]) -> Result<Vec<OwnedItem>>;
}

/// Apply an item batch to an in-memory record, validating every id first.
pub(crate) fn apply_item_batch(
    record: &mut ActorRecord,
    updates: &[ItemUpdate],
) -> Result<Vec<OwnedItem>> {
    if let Some(missing) = updates.iter().find(|u| record.item(&u.item).is_none()) {
        return Err(StoreError::UnknownItem {
            actor: record.id.clone(),
            item: missing.item.clone(),
        });
    }

    let mut items = Vec::with_capacity(updates.len());
    for update in updates {
        record.apply_item_update(update);
        if let Some(item) = record.item(&update.item) {
            items.push(item.clone());
        }
    }
    Ok(items)
}
