//! Armor class.
//!
//! The stored `calc` mode selects one calculation:
//!
//! | mode       | armor term                                          |
//! |------------|-----------------------------------------------------|
//! | `flat`     | stored flat value, nothing else added               |
//! | `natural`  | stored flat value                                   |
//! | `default`  | body armor + capped dex, or the unarmored formula   |
//! | `starship` | starship base + dex + installed hull plating        |
//! | `custom`   | the record's own formula                            |
//! | other      | named formula from the ruleset (`mage`, ...)        |
//!
//! Every mode but `flat` then adds shield, bonus and cover. A formula that fails
//! to evaluate falls back to `default` and records a warning.

use std::collections::BTreeMap;

use super::base::AcAccumulator;
use super::{Ability, ArmorClass, DerivationWarning, ItemSlot, first_authoritative};
use crate::config::RulesetConfig;
use crate::formula::{Formula, RollData};
use crate::ids::AbilityId;
use crate::modifiers::ModifierMap;
use crate::record::{AcCalc, ActorRecord, ArmorData, ArmorSlot, ItemKind, StarshipComponent};

pub(super) fn derive_armor_class(
    record: &ActorRecord,
    acc: AcAccumulator,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    abilities: &BTreeMap<AbilityId, Ability>,
    roll_data: &RollData,
    warnings: &mut Vec<DerivationWarning>,
) -> ArmorClass {
    let stored = &record.attributes.ac;
    let dex = abilities
        .get(&config.armor_class.ability)
        .map_or(0, |a| a.modifier);

    let equipped = move |slot: ArmorSlot| {
        record.items.iter().filter_map(move |item| match &item.system {
            ItemKind::Equipment(equipment) if item.equipped => equipment
                .armor
                .as_ref()
                .filter(|armor| armor.slot == slot)
                .map(|armor| (&item.id, armor)),
            _ => None,
        })
    };
    let body = first_authoritative(ItemSlot::BodyArmor, equipped(ArmorSlot::Body), warnings);
    let shield_item = first_authoritative(ItemSlot::Shield, equipped(ArmorSlot::Shield), warnings);

    let shield = acc
        .shield
        .saturating_add(shield_item.map_or(0, |(_, armor)| armor.value));
    let bonus = modifiers.int("attributes.ac.bonus", acc.bonus);
    let cover = modifiers.int("attributes.ac.cover", acc.cover);
    let flat = match stored.flat {
        Some(flat) => Some(modifiers.int("attributes.ac.flat", flat)),
        None if modifiers.has("attributes.ac.flat") => Some(modifiers.int("attributes.ac.flat", 0)),
        None => None,
    };

    let body_armor = body.map(|(_, armor)| armor);
    let default = |warnings: &mut Vec<DerivationWarning>| {
        default_armor(body_armor, dex, acc, config, roll_data, warnings)
    };

    let armor = match &stored.calc {
        AcCalc::Flat | AcCalc::Natural => flat.unwrap_or(acc.armor),
        AcCalc::Default => default(warnings),
        AcCalc::Starship => {
            let plating = record
                .installed_components()
                .find_map(|(_, part)| match part {
                    StarshipComponent::Armor { ac_bonus, .. } => Some(*ac_bonus),
                    _ => None,
                })
                .unwrap_or(0);
            config
                .armor_class
                .starship_base
                .saturating_add(dex)
                .saturating_add(plating)
        }
        AcCalc::Custom => evaluate_or_default(
            "custom",
            &stored.formula,
            roll_data,
            warnings,
            default,
        ),
        AcCalc::Named(name) => match config.armor_class.formulas.get(name) {
            Some(formula) => evaluate_or_default(name, formula, roll_data, warnings, default),
            None => {
                warnings.push(DerivationWarning::UnknownArmorCalc { calc: name.clone() });
                default(warnings)
            }
        },
    };

    let value = match stored.calc {
        AcCalc::Flat => armor,
        _ => armor
            .saturating_add(shield)
            .saturating_add(bonus)
            .saturating_add(cover),
    };

    ArmorClass {
        calc: stored.calc.clone(),
        armor,
        shield,
        bonus,
        cover,
        value,
        equipped_armor: body.map(|(id, _)| id.clone()),
        equipped_shield: shield_item.map(|(id, _)| id.clone()),
    }
}

/// Body armor plus capped dex, or the unarmored formula.
fn default_armor(
    body: Option<&ArmorData>,
    dex: i32,
    acc: AcAccumulator,
    config: &RulesetConfig,
    roll_data: &RollData,
    warnings: &mut Vec<DerivationWarning>,
) -> i32 {
    if let Some(armor) = body {
        let dex = armor.dex_cap.map_or(dex, |cap| dex.min(cap));
        return armor.value.saturating_add(dex);
    }

    let unarmored = &config.armor_class.unarmored;
    match Formula::parse(unarmored).and_then(|f| f.evaluate(roll_data, None)) {
        Ok(evaluation) => evaluation.total.floor() as i32,
        Err(error) => {
            warnings.push(DerivationWarning::FormulaEvaluation {
                context: "ac.unarmored".into(),
                formula: unarmored.clone(),
                error,
            });
            acc.armor.saturating_add(dex)
        }
    }
}

fn evaluate_or_default(
    context: &str,
    formula: &str,
    roll_data: &RollData,
    warnings: &mut Vec<DerivationWarning>,
    default: impl FnOnce(&mut Vec<DerivationWarning>) -> i32,
) -> i32 {
    match Formula::parse(formula).and_then(|f| f.evaluate(roll_data, None)) {
        Ok(evaluation) => evaluation.total.floor() as i32,
        Err(error) => {
            warnings.push(DerivationWarning::FormulaEvaluation {
                context: format!("ac.{context}"),
                formula: formula.to_owned(),
                error,
            });
            default(warnings)
        }
    }
}
