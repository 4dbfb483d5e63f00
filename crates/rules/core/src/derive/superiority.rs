//! Superiority progression.

use super::Superiority;
use crate::config::{RulesetConfig, lookup};
use crate::modifiers::ModifierMap;
use crate::pools::{PoolKind, ResourcePool};
use crate::record::{ActorKind, ActorRecord};

/// Level-weighted superiority across classes.
///
/// Each class contributes `levels × multiplier`, the multiplier clamped to
/// `[0, 1]`. Returns `None` for actors with no superiority at all.
pub(super) fn derive_superiority(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
) -> Option<Superiority> {
    let rules = &config.superiority;
    let level: f64 = record
        .classes()
        .map(|(_, class)| f64::from(class.levels) * class.superiority.clamp(0.0, 1.0))
        .sum();
    let index = level.floor() as usize;

    let base_dice = lookup(&rules.dice, index) as i32;
    let max = modifiers.int("attributes.super.dice.max", base_dice).max(0) as u32;
    let known = lookup(&rules.known, index);
    if max == 0 && known == 0 {
        return None;
    }
    let die_size = lookup(&rules.die_size, index);

    let current = match (record.kind, record.attributes.superiority) {
        (ActorKind::Npc, None) => max,
        (_, stored) => stored.unwrap_or(0),
    };

    let mut dice = ResourcePool::new(PoolKind::SuperiorityDice, current, max);
    if die_size > 0 {
        dice = dice.with_denomination(die_size);
    }
    Some(Superiority { level, known, dice })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::Modifier;
    use crate::record::{ClassData, ItemKind, OwnedItem};

    fn class(id: &str, levels: u32, superiority: f64) -> OwnedItem {
        OwnedItem::new(
            id,
            id,
            ItemKind::Class(ClassData {
                identifier: id.into(),
                levels,
                hit_die: 10,
                superiority,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn weighted_level_feeds_tables() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("pc", ActorKind::Character);
        record.items.push(class("fighter", 6, 1.0));
        record.items.push(class("scholar", 4, 0.5));
        record.attributes.superiority = Some(9);

        let sup = derive_superiority(&record, &ModifierMap::default(), &config).unwrap();
        assert_eq!(sup.level, 8.0);
        assert_eq!(sup.known, 7);
        assert_eq!(sup.dice.max(), 4);
        assert_eq!(sup.dice.current(), 4);
        assert_eq!(sup.dice.denomination, Some(6));
    }

    #[test]
    fn no_superiority_without_progression() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("pc", ActorKind::Character);
        record.items.push(class("consular", 10, 0.0));
        assert!(derive_superiority(&record, &ModifierMap::default(), &config).is_none());

        let modifiers = ModifierMap::resolve(&[Modifier::add("attributes.super.dice.max", 1)]);
        let sup = derive_superiority(&record, &modifiers, &config).unwrap();
        assert_eq!(sup.dice.max(), 1);
        assert_eq!(sup.dice.current(), 0);
    }
}
