//! Direct die rolls and point spends.

mod common;

use std::sync::Arc;

use common::{Scripted, engine, freighter, kira};
use rules_core::{ActorId, CasterTrack, DieSelection, ItemKind, PoolKind, Subsystem};
use rules_runtime::{AcceptDefaults, CancelAll, InMemoryRecordStore, RecordStore, RuntimeError};

fn consular() -> rules_core::ActorRecord {
    rules_content::RecordLoader::from_json_str(
        r#"{
            "id": "tarn",
            "kind": "character",
            "abilities": { "wis": { "value": 16 } },
            "attributes": { "hp": { "value": 8, "max": 18 }, "points": { "force": 5 } },
            "items": [
                {
                    "id": "consular",
                    "system": {
                        "type": "class",
                        "identifier": "consular",
                        "levels": 3,
                        "hitDie": 6,
                        "powercasting": { "force": "full" }
                    }
                }
            ]
        }"#,
    )
    .expect("fixture parses")
}

#[tokio::test]
async fn chosen_denomination_is_rolled() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let decisions = Scripted {
        die: Some(DieSelection::Denomination(10)),
        ..Default::default()
    };
    let engine = engine(&store, decisions, &[4]);
    let id = ActorId::from("kira");

    let roll = engine.roll_hit_die(&id, None).await.unwrap();
    assert_eq!(roll.denomination, 10);
    assert_eq!(roll.pool, PoolKind::HitDice);
    assert_eq!(roll.roll.total, 6);
    assert_eq!(roll.gained, 6);

    let stored = store.load(&id).await.unwrap();
    assert_eq!(stored.attributes.hp.value, 16);
    let ItemKind::Class(fighter) = &stored.item(&"fighter".into()).unwrap().system else {
        panic!("fighter is a class");
    };
    assert_eq!(fighter.hit_dice_used, 1);
    assert_eq!(store.record_writes(), 1);
    assert_eq!(store.item_writes(), 1);
}

#[tokio::test]
async fn dismissed_die_choice_writes_nothing() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let engine = engine(&store, CancelAll, &[4]);

    let err = engine
        .roll_hit_die(&ActorId::from("kira"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Cancelled));
    assert_eq!(store.record_writes(), 0);
    assert_eq!(store.item_writes(), 0);
}

#[tokio::test]
async fn full_hp_still_spends_the_die() {
    let mut record = kira();
    record.attributes.hp.value = 20;
    let store = Arc::new(InMemoryRecordStore::with_records([record]));
    let engine = engine(&store, AcceptDefaults, &[6]);
    let id = ActorId::from("kira");

    let roll = engine
        .roll_hit_die(&id, Some(DieSelection::Largest))
        .await
        .unwrap();
    assert_eq!(roll.roll.total, 8);
    assert_eq!(roll.gained, 0);

    let stored = store.load(&id).await.unwrap();
    assert_eq!(stored.attributes.hp.value, 20);
    let ItemKind::Class(fighter) = &stored.item(&"fighter".into()).unwrap().system else {
        panic!("fighter is a class");
    };
    assert_eq!(fighter.hit_dice_used, 1);
}

#[tokio::test]
async fn exhausted_pool_is_a_typed_failure() {
    let mut record = kira();
    for item in &mut record.items {
        if let ItemKind::Class(class) = &mut item.system {
            class.hit_dice_used = class.levels;
        }
    }
    let store = Arc::new(InMemoryRecordStore::with_records([record]));
    let engine = engine(&store, AcceptDefaults, &[]);

    let err = engine
        .roll_hit_die(&ActorId::from("kira"), None)
        .await
        .unwrap_err();
    match err {
        RuntimeError::InsufficientResource(err) => assert_eq!(err.pool, PoolKind::HitDice),
        other => panic!("expected insufficient resource, got {other:?}"),
    }
    assert_eq!(store.record_writes(), 0);
}

#[tokio::test]
async fn spending_points_clamps_and_persists() {
    let store = Arc::new(InMemoryRecordStore::with_records([consular()]));
    let engine = engine(&store, AcceptDefaults, &[]);
    let id = ActorId::from("tarn");

    let pool = engine
        .spend_powercasting_points(&id, CasterTrack::Force, 3)
        .await
        .unwrap();
    // 3 levels * 4 + wis 3
    assert_eq!(pool.max(), 15);
    assert_eq!(pool.current(), 2);
    assert_eq!(
        store.load(&id).await.unwrap().attributes.points.get(&CasterTrack::Force),
        Some(&2)
    );

    let err = engine
        .spend_powercasting_points(&id, CasterTrack::Force, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InsufficientResource(_)));

    let err = engine
        .spend_powercasting_points(&id, CasterTrack::Tech, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::NoSuchResource { .. }));
}

#[tokio::test]
async fn starship_operations() {
    let mut ship = freighter();
    ship.attributes.power_dice.insert(Subsystem::Central, 2);
    let store = Arc::new(InMemoryRecordStore::with_records([ship, kira()]));
    let engine = engine(&store, AcceptDefaults, &[5]);
    let id = ActorId::from("freighter");

    let pool = engine.expend_power_die(&id, Subsystem::Central).await.unwrap();
    assert_eq!(pool.current(), 1);
    assert_eq!(pool.denomination, Some(4));

    let roll = engine.roll_hull_die(&id, None).await.unwrap();
    assert_eq!(roll.pool, PoolKind::HullDice);
    assert_eq!(store.load(&id).await.unwrap().attributes.hp.value, 15);

    let err = engine
        .expend_power_die(&ActorId::from("kira"), Subsystem::Central)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::NotAStarship { .. }));
}
