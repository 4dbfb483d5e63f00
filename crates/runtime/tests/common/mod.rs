//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rules_core::record::{
    StarshipComponent, StarshipEquipmentData, StarshipSizeData,
};
use rules_core::{
    ActorKind, ActorRecord, DieSelection, ItemKind, OwnedItem, PowerAllocation, ScriptedRoller,
    Subsystem, WorkflowOptions,
};
use rules_runtime::{
    AllocationPrompt, Decision, DecisionProvider, DieChoicePrompt, InMemoryRecordStore,
    RulesEngine, WorkflowPrompt,
};

/// A level 4 multiclass character at 10/20 HP with CON 14.
pub fn kira() -> ActorRecord {
    rules_content::RecordLoader::from_json_str(
        r#"{
            "id": "kira",
            "name": "Kira",
            "kind": "character",
            "abilities": { "con": { "value": 14 } },
            "attributes": { "hp": { "value": 10, "max": 20 } },
            "items": [
                {
                    "id": "scout",
                    "system": { "type": "class", "identifier": "scout", "levels": 2, "hitDie": 8 }
                },
                {
                    "id": "fighter",
                    "system": { "type": "class", "identifier": "fighter", "levels": 2, "hitDie": 10 }
                }
            ]
        }"#,
    )
    .expect("fixture parses")
}

/// A tier 1 medium starship with a reactor recovering 3 power dice.
pub fn freighter() -> ActorRecord {
    let mut record = ActorRecord::new("freighter", ActorKind::Starship);
    record.details.tier = 1;
    record.attributes.hp.value = 10;
    record.attributes.hp.max = 50;
    record.items.push(OwnedItem::new(
        "hull",
        "Medium Hull",
        ItemKind::StarshipSize(StarshipSizeData {
            hull_dice_used: 2,
            ..Default::default()
        }),
    ));
    record.items.push(
        OwnedItem::new(
            "reactor",
            "Fuel Cell",
            ItemKind::StarshipEquipment(StarshipEquipmentData::new(StarshipComponent::Reactor {
                fuel_cost: 0,
                power_recovery: 3,
            })),
        )
        .equipped(),
    );
    record
}

pub fn engine(
    store: &Arc<InMemoryRecordStore>,
    decisions: impl DecisionProvider + 'static,
    rolls: &[u32],
) -> RulesEngine {
    RulesEngine::builder()
        .store(store.clone())
        .decisions(decisions)
        .roller(ScriptedRoller::new(rolls.iter().copied()))
        .build()
        .expect("engine builds")
}

/// Answers prompts from fixed values; `None` dismisses the prompt.
#[derive(Default)]
pub struct Scripted {
    pub options: Option<fn(WorkflowOptions) -> WorkflowOptions>,
    pub allocation: Option<PowerAllocation>,
    pub die: Option<DieSelection>,
}

#[async_trait]
impl DecisionProvider for Scripted {
    async fn confirm_workflow(&self, prompt: &WorkflowPrompt) -> Decision<WorkflowOptions> {
        match self.options {
            Some(adjust) => Decision::Chosen(adjust(prompt.options)),
            None => Decision::Cancelled,
        }
    }

    async fn allocate_power(&self, _prompt: &AllocationPrompt) -> Decision<PowerAllocation> {
        match &self.allocation {
            Some(allocation) => Decision::Chosen(allocation.clone()),
            None => Decision::Cancelled,
        }
    }

    async fn choose_die(&self, _prompt: &DieChoicePrompt) -> Decision<DieSelection> {
        match &self.die {
            Some(selection) => Decision::Chosen(selection.clone()),
            None => Decision::Cancelled,
        }
    }
}

pub fn explicit(amounts: &[(Subsystem, u32)]) -> PowerAllocation {
    PowerAllocation::Explicit(amounts.iter().copied().collect::<BTreeMap<_, _>>())
}
