//! Persistable patches.
//!
//! Every write the engine issues is one [`ActorUpdate`] plus a batch of
//! [`ItemUpdate`]s. Fields left `None` (or empty maps) are untouched, so an
//! empty update is a no-op.

use std::collections::BTreeMap;

use crate::config::CasterTrack;
use crate::ids::{AbilityId, ItemId, SkillId};
use crate::record::{AbilityData, ActorRecord, ItemKind, SkillData, Subsystem};

/// Record-level patch.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ActorUpdate {
    /// Ability entries synthesized by the Base Stage.
    pub abilities: BTreeMap<AbilityId, AbilityData>,
    /// Skill entries synthesized or repaired by the Base Stage.
    pub skills: BTreeMap<SkillId, SkillData>,
    pub hp: Option<i32>,
    pub temp_hp: Option<i32>,
    pub temp_max_hp: Option<i32>,
    pub reset_death_saves: bool,
    pub points: BTreeMap<CasterTrack, u32>,
    pub superiority_dice: Option<u32>,
    pub power_dice: BTreeMap<Subsystem, u32>,
    pub shield_points: Option<u32>,
    pub shields_depleted: Option<bool>,
}

impl ActorUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Layer `other` on top of `self`; `other` wins where both set a field.
    pub fn merge(&mut self, other: ActorUpdate) {
        self.abilities.extend(other.abilities);
        self.skills.extend(other.skills);
        self.hp = other.hp.or(self.hp);
        self.temp_hp = other.temp_hp.or(self.temp_hp);
        self.temp_max_hp = other.temp_max_hp.or(self.temp_max_hp);
        self.reset_death_saves |= other.reset_death_saves;
        self.points.extend(other.points);
        self.superiority_dice = other.superiority_dice.or(self.superiority_dice);
        self.power_dice.extend(other.power_dice);
        self.shield_points = other.shield_points.or(self.shield_points);
        self.shields_depleted = other.shields_depleted.or(self.shields_depleted);
    }
}

/// Patch for one owned item's usage counters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct ItemUpdate {
    pub item: ItemId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hit_dice_used: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hull_dice_used: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shld_dice_used: Option<u32>,
    /// New remaining uses.
    #[cfg_attr(feature = "serde", serde(default))]
    pub uses: Option<u32>,
}

impl ItemUpdate {
    pub fn new(item: ItemId) -> Self {
        Self {
            item,
            hit_dice_used: None,
            hull_dice_used: None,
            shld_dice_used: None,
            uses: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hit_dice_used.is_none()
            && self.hull_dice_used.is_none()
            && self.shld_dice_used.is_none()
            && self.uses.is_none()
    }

    /// Layer `other` (for the same item) on top of `self`.
    pub fn merge(&mut self, other: &ItemUpdate) {
        debug_assert_eq!(self.item, other.item);
        self.hit_dice_used = other.hit_dice_used.or(self.hit_dice_used);
        self.hull_dice_used = other.hull_dice_used.or(self.hull_dice_used);
        self.shld_dice_used = other.shld_dice_used.or(self.shld_dice_used);
        self.uses = other.uses.or(self.uses);
    }
}

/// Fold a list of item updates into one entry per item, keeping first-seen order.
pub fn merge_item_updates(updates: impl IntoIterator<Item = ItemUpdate>) -> Vec<ItemUpdate> {
    let mut merged: Vec<ItemUpdate> = Vec::new();
    for update in updates {
        match merged.iter_mut().find(|u| u.item == update.item) {
            Some(existing) => existing.merge(&update),
            None => merged.push(update),
        }
    }
    merged.retain(|u| !u.is_empty());
    merged
}

impl ActorRecord {
    /// Apply a record-level patch in place.
    pub fn apply_update(&mut self, update: &ActorUpdate) {
        for (id, ability) in &update.abilities {
            self.abilities.insert(id.clone(), ability.clone());
        }
        for (id, skill) in &update.skills {
            self.skills.insert(id.clone(), skill.clone());
        }

        let attributes = &mut self.attributes;
        if let Some(hp) = update.hp {
            attributes.hp.value = hp;
        }
        if let Some(temp) = update.temp_hp {
            attributes.hp.temp = temp;
        }
        if let Some(temp_max) = update.temp_max_hp {
            attributes.hp.temp_max = temp_max;
        }
        if update.reset_death_saves {
            attributes.death = Default::default();
        }
        attributes
            .points
            .extend(update.points.iter().map(|(k, v)| (*k, *v)));
        if let Some(dice) = update.superiority_dice {
            attributes.superiority = Some(dice);
        }
        attributes
            .power_dice
            .extend(update.power_dice.iter().map(|(k, v)| (*k, *v)));
        if let Some(points) = update.shield_points {
            attributes.shield_points = points;
        }
        if let Some(depleted) = update.shields_depleted {
            attributes.shields_depleted = depleted;
        }
    }

    /// Apply one item patch. Returns `false` when the item is not owned.
    pub fn apply_item_update(&mut self, update: &ItemUpdate) -> bool {
        let Some(item) = self.item_mut(&update.item) else {
            return false;
        };

        match &mut item.system {
            ItemKind::Class(class) => {
                if let Some(used) = update.hit_dice_used {
                    class.hit_dice_used = used;
                }
            }
            ItemKind::StarshipSize(size) => {
                if let Some(used) = update.hull_dice_used {
                    size.hull_dice_used = used;
                }
                if let Some(used) = update.shld_dice_used {
                    size.shld_dice_used = used;
                }
            }
            _ => {}
        }
        if let (Some(value), Some(uses)) = (update.uses, item.uses.as_mut()) {
            uses.value = value;
        }
        true
    }
}
