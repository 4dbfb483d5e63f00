//! File-backed record store.

mod common;

use std::sync::Arc;

use common::kira;
use rules_core::{ActorId, ActorUpdate, ItemUpdate, RequestedOptions, RestKind};
use rules_runtime::{FileRecordStore, RecordStore, RulesEngine, StoreError};

#[tokio::test]
async fn records_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::new(dir.path().join("records")).await.unwrap();
    let id = ActorId::from("kira");

    store.save(&kira()).await.unwrap();
    assert_eq!(store.load(&id).await.unwrap(), kira());

    let updated = store
        .update_record(
            &id,
            &ActorUpdate {
                hp: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.attributes.hp.value, 3);

    let items = store
        .update_items(
            &id,
            &[ItemUpdate {
                hit_dice_used: Some(1),
                ..ItemUpdate::new("scout".into())
            }],
        )
        .await
        .unwrap();
    assert_eq!(items.len(), 1);

    // A fresh store over the same directory sees both writes.
    let reopened = FileRecordStore::new(store.base_dir()).await.unwrap();
    let record = reopened.load(&id).await.unwrap();
    assert_eq!(record.attributes.hp.value, 3);

    let leftovers: Vec<_> = std::fs::read_dir(store.base_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn unsafe_ids_and_missing_records_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::new(dir.path()).await.unwrap();

    let err = store.load(&ActorId::from("../escape")).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidId(_)));

    let err = store.load(&ActorId::from("ghost")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn long_rest_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::new(dir.path()).await.unwrap());
    let mut record = kira();
    record.attributes.hp.value = 1;
    store.save(&record).await.unwrap();

    let engine = RulesEngine::builder()
        .store(store.clone())
        .seed(7)
        .build()
        .unwrap();
    let id = ActorId::from("kira");
    let outcome = engine
        .rest(&id, RestKind::Long, RequestedOptions::default())
        .await
        .unwrap();
    assert!(!outcome.is_cancelled());

    let stored = store.load(&id).await.unwrap();
    assert_eq!(stored.attributes.hp.value, 20);
    assert_eq!(stored.abilities.len(), 6);
}
