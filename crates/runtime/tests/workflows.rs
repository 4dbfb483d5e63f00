//! Rest and repair workflows against the in-memory store.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Scripted, engine, explicit, freighter, kira};
use rules_core::{
    ActorId, ActorRecord, ActorUpdate, ItemKind, ItemUpdate, OwnedItem, PoolKind, RepairKind,
    RequestedOptions, RestKind, ScriptedRoller, Subsystem,
};
use rules_runtime::{
    AcceptDefaults, CancelAll, InMemoryRecordStore, RecordStore, RulesEngine, RuntimeError,
    StoreError,
};

fn hit_dice_used(record: &rules_core::ActorRecord, id: &str) -> u32 {
    match &record.item(&id.into()).expect("item exists").system {
        ItemKind::Class(class) => class.hit_dice_used,
        _ => panic!("{id} is not a class"),
    }
}

#[tokio::test]
async fn short_rest_spends_hit_dice_until_threshold() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    // d10 3 + 2 -> 15, d10 5 + 2 -> capped at 20
    let engine = engine(&store, AcceptDefaults, &[3, 5]);
    let id = ActorId::from("kira");

    let outcome = engine
        .rest(
            &id,
            RestKind::Short,
            RequestedOptions {
                auto_dice: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = outcome.report().expect("completed");
    assert_eq!(report.result.dice_rolls.len(), 2);
    assert_eq!(report.result.dice_rolls[1].roll.total, 7);
    assert_eq!(report.result.dice_rolls[1].gained, 5);
    assert_eq!(report.result.delta(PoolKind::HitPoints), 10);
    assert_eq!(report.record.attributes.hp.value, 20);
    assert_eq!(hit_dice_used(&report.record, "fighter"), 2);
    assert_eq!(hit_dice_used(&report.record, "scout"), 0);

    // One record write (patch folded in) and one item batch.
    assert_eq!(store.record_writes(), 1);
    assert_eq!(store.item_writes(), 1);

    let stored = store.load(&id).await.unwrap();
    assert_eq!(stored.attributes.hp.value, 20);
    assert_eq!(stored.abilities.len(), 6);
}

#[tokio::test]
async fn rederiving_after_a_rest_issues_no_writes() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let engine = engine(&store, AcceptDefaults, &[]);
    let id = ActorId::from("kira");

    let first = engine.derive(&id).await.unwrap();
    assert!(first.patch.is_some());
    assert_eq!(store.record_writes(), 1);

    let second = engine.derive(&id).await.unwrap();
    assert!(second.patch.is_none());
    assert_eq!(second.actor, first.actor);
    assert_eq!(store.record_writes(), 1);
}

#[tokio::test]
async fn long_rest_restores_hit_points_and_every_die() {
    let mut record = kira();
    record.attributes.hp.temp = 4;
    for item in &mut record.items {
        if let ItemKind::Class(class) = &mut item.system {
            class.hit_dice_used = class.levels;
        }
    }
    let store = Arc::new(InMemoryRecordStore::with_records([record]));
    let engine = engine(&store, AcceptDefaults, &[]);
    let id = ActorId::from("kira");

    let outcome = engine
        .rest(&id, RestKind::Long, RequestedOptions::default())
        .await
        .unwrap();
    let report = outcome.report().expect("completed");
    assert!(report.result.new_day);
    assert_eq!(report.record.attributes.hp.value, 20);
    assert_eq!(report.record.attributes.hp.temp, 0);
    assert_eq!(report.result.delta(PoolKind::HitDice), 4);
    assert_eq!(hit_dice_used(&report.record, "fighter"), 0);
    assert_eq!(hit_dice_used(&report.record, "scout"), 0);
}

#[tokio::test]
async fn cancelled_dialog_writes_nothing() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let engine = engine(&store, CancelAll, &[]);
    let id = ActorId::from("kira");

    let outcome = engine
        .rest(
            &id,
            RestKind::Long,
            RequestedOptions {
                dialog: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(store.record_writes(), 0);
    assert_eq!(store.item_writes(), 0);
    assert_eq!(store.load(&id).await.unwrap(), kira());
}

#[tokio::test]
async fn dialog_can_change_options() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let decisions = Scripted {
        options: Some(|mut options| {
            options.auto_dice = true;
            options
        }),
        ..Default::default()
    };
    let engine = engine(&store, decisions, &[10, 10]);
    let id = ActorId::from("kira");

    let outcome = engine
        .rest(
            &id,
            RestKind::Short,
            RequestedOptions {
                dialog: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let report = outcome.report().expect("completed");
    // 10 + 12 fills the pool with one die
    assert_eq!(report.result.dice_rolls.len(), 1);
    assert_eq!(report.record.attributes.hp.value, 20);
}

#[tokio::test]
async fn repairs_require_a_starship() {
    let store = Arc::new(InMemoryRecordStore::with_records([kira()]));
    let engine = engine(&store, AcceptDefaults, &[]);

    let err = engine
        .repair(&ActorId::from("kira"), RepairKind::Regen, RequestedOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::NotAStarship { .. }));
    assert_eq!(store.record_writes(), 0);
}

#[tokio::test]
async fn recharge_repair_uses_chosen_power_allocation() {
    let store = Arc::new(InMemoryRecordStore::with_records([freighter()]));
    let decisions = Scripted {
        options: Some(|mut options| {
            options.auto_dice = true;
            options
        }),
        allocation: Some(explicit(&[(Subsystem::Engines, 2), (Subsystem::Weapons, 5)])),
        die: None,
    };
    let engine = engine(&store, decisions, &[8, 8, 8, 8]);
    let id = ActorId::from("freighter");

    let outcome = engine
        .repair(
            &id,
            RepairKind::Recharge,
            RequestedOptions {
                dialog: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let report = outcome.report().expect("completed");

    // Four hull dice available, each rolls 8.
    assert_eq!(report.result.delta(PoolKind::HullDice), -4);
    assert_eq!(report.record.attributes.hp.value, 42);
    // Three dice recovered: engines takes its capacity of 2, weapons the rest.
    let power = &report.record.attributes.power_dice;
    assert_eq!(power.get(&Subsystem::Engines), Some(&2));
    assert_eq!(power.get(&Subsystem::Weapons), Some(&1));
    assert_eq!(power.get(&Subsystem::Central), None);
    assert!(!report.record.attributes.shields_depleted);
}

#[tokio::test]
async fn regen_repair_resets_depleted_shields() {
    let mut ship = freighter();
    ship.attributes.shields_depleted = true;
    let store = Arc::new(InMemoryRecordStore::with_records([ship]));
    let engine = engine(&store, AcceptDefaults, &[]);
    let id = ActorId::from("freighter");

    let outcome = engine
        .repair(&id, RepairKind::Regen, RequestedOptions::default())
        .await
        .unwrap();
    let report = outcome.report().expect("completed");
    assert!(!report.record.attributes.shields_depleted);
    assert_eq!(report.record.attributes.hp.value, 10);
    assert_eq!(report.record.attributes.power_dice.get(&Subsystem::Central), Some(&4));
}

/// Delegates to an in-memory store but rejects every item batch.
struct BrokenItems(Arc<InMemoryRecordStore>);

#[async_trait]
impl RecordStore for BrokenItems {
    async fn load(&self, id: &ActorId) -> Result<ActorRecord, StoreError> {
        self.0.load(id).await
    }

    async fn update_record(
        &self,
        id: &ActorId,
        update: &ActorUpdate,
    ) -> Result<ActorRecord, StoreError> {
        self.0.update_record(id, update).await
    }

    async fn update_items(
        &self,
        _id: &ActorId,
        _updates: &[ItemUpdate],
    ) -> Result<Vec<OwnedItem>, StoreError> {
        Err(StoreError::LockPoisoned)
    }
}

#[tokio::test]
async fn failed_item_batch_surfaces_after_record_write() {
    let mut record = kira();
    for item in &mut record.items {
        if let ItemKind::Class(class) = &mut item.system {
            class.hit_dice_used = class.levels;
        }
    }
    let inner = Arc::new(InMemoryRecordStore::with_records([record]));
    let engine = RulesEngine::builder()
        .store(Arc::new(BrokenItems(inner.clone())))
        .decisions(AcceptDefaults)
        .roller(ScriptedRoller::new([0u32; 0]))
        .build()
        .expect("engine builds");
    let id = ActorId::from("kira");

    let err = engine
        .rest(&id, RestKind::Long, RequestedOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Store(StoreError::LockPoisoned)));

    // The record half of the apply stands; the dice were never reset.
    assert_eq!(inner.record_writes(), 1);
    assert_eq!(inner.item_writes(), 0);
    let stored = inner.load(&id).await.unwrap();
    assert_eq!(stored.attributes.hp.value, 20);
    assert_eq!(hit_dice_used(&stored, "fighter"), 2);
}
