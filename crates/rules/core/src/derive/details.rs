//! Proficiency bonus, scale values and roll data.

use std::collections::BTreeMap;

use super::Ability;
use crate::config::RulesetConfig;
use crate::formula::RollData;
use crate::ids::AbilityId;
use crate::modifiers::ModifierMap;
use crate::record::{ActorKind, ActorRecord, ScaleValue};

/// Proficiency bonus by actor kind, with the `attributes.prof` modifier on top.
///
/// - character: level table over total class levels
/// - npc: `max(2, floor((cr + 7) / 4))`
/// - starship: tier table
/// - vehicle: none
pub(super) fn proficiency_bonus(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
) -> i32 {
    let base = match record.kind {
        ActorKind::Character => config.proficiency_for_level(record.total_class_levels()),
        ActorKind::Npc => (((record.details.cr + 7.0) / 4.0).floor() as i32).max(2),
        ActorKind::Starship => config.proficiency_for_tier(record.details.tier),
        ActorKind::Vehicle | ActorKind::Group => 0,
    };
    modifiers.int("attributes.prof", base)
}

/// Scale values for each class at its current level, keyed `<class>.<identifier>`.
///
/// A table entry applies from its level onward until a higher entry replaces it.
pub(super) fn scale_values(record: &ActorRecord) -> BTreeMap<String, ScaleValue> {
    let mut out = BTreeMap::new();
    for (_, class) in record.classes() {
        if class.identifier.is_empty() {
            continue;
        }
        for advancement in &class.scale {
            let current = advancement
                .values
                .range(..=class.levels)
                .next_back()
                .map(|(_, value)| *value);
            if let Some(value) = current {
                out.insert(
                    format!("{}.{}", class.identifier, advancement.identifier),
                    value,
                );
            }
        }
    }
    out
}

/// Roll data published to formulas after the ability stage.
pub(super) fn roll_data(
    record: &ActorRecord,
    prof: i32,
    abilities: &BTreeMap<AbilityId, Ability>,
    scale: &BTreeMap<String, ScaleValue>,
) -> RollData {
    let mut data = RollData::new();
    data.insert_number("prof", f64::from(prof));
    data.insert_number("details.level", f64::from(record.total_class_levels()));
    data.insert_number("details.cr", record.details.cr);
    data.insert_number("details.tier", f64::from(record.details.tier));

    for (id, ability) in abilities {
        data.insert_number(format!("abilities.{id}.value"), f64::from(ability.value));
        data.insert_number(format!("abilities.{id}.mod"), f64::from(ability.modifier));
        data.insert_number(format!("abilities.{id}.save"), f64::from(ability.save));
        data.insert_number(format!("abilities.{id}.dc"), f64::from(ability.dc));
    }

    for (_, class) in record.classes() {
        if !class.identifier.is_empty() {
            data.insert_number(
                format!("classes.{}.levels", class.identifier),
                f64::from(class.levels),
            );
        }
    }

    for (key, value) in scale {
        let path = format!("scale.{key}");
        match *value {
            ScaleValue::Number(number) => data.insert_number(path, number),
            ScaleValue::Dice { count, faces } => data.insert_dice(path, count, faces),
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::Modifier;
    use crate::record::{ClassData, ItemKind, OwnedItem, ScaleAdvancement};

    fn class(identifier: &str, levels: u32) -> OwnedItem {
        OwnedItem::new(
            identifier,
            identifier,
            ItemKind::Class(ClassData {
                identifier: identifier.into(),
                levels,
                hit_die: 8,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn npc_proficiency_follows_challenge() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("npc", ActorKind::Npc);
        record.details.cr = 0.25;
        assert_eq!(proficiency_bonus(&record, &ModifierMap::default(), &config), 2);
        record.details.cr = 9.0;
        assert_eq!(proficiency_bonus(&record, &ModifierMap::default(), &config), 4);
    }

    #[test]
    fn character_proficiency_uses_total_levels() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("pc", ActorKind::Character);
        record.items.push(class("scout", 3));
        record.items.push(class("fighter", 2));
        assert_eq!(proficiency_bonus(&record, &ModifierMap::default(), &config), 3);

        let modifiers = ModifierMap::resolve(&[Modifier::add("attributes.prof", 1)]);
        assert_eq!(proficiency_bonus(&record, &modifiers, &config), 4);
    }

    #[test]
    fn scale_value_tracks_class_level() {
        let mut item = class("operative", 5);
        if let ItemKind::Class(class) = &mut item.system {
            class.scale.push(ScaleAdvancement {
                identifier: "sneak".into(),
                values: [
                    (1, ScaleValue::Dice { count: 1, faces: 6 }),
                    (3, ScaleValue::Dice { count: 2, faces: 6 }),
                    (7, ScaleValue::Dice { count: 4, faces: 6 }),
                ]
                .into_iter()
                .collect(),
            });
        }
        let mut record = ActorRecord::new("pc", ActorKind::Character);
        record.items.push(item);

        let scale = scale_values(&record);
        assert_eq!(
            scale.get("operative.sneak"),
            Some(&ScaleValue::Dice { count: 2, faces: 6 })
        );

        let data = roll_data(&record, 3, &BTreeMap::new(), &scale);
        assert!(data.get("scale.operative.sneak").is_some());
        assert_eq!(data.number("classes.operative.levels"), Some(5.0));
    }
}
