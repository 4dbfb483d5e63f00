//! Carried weight and capacity.

use std::collections::BTreeMap;

use super::{Ability, EffectiveFlags, Encumbrance};
use crate::config::RulesetConfig;
use crate::ids::AbilityId;
use crate::modifiers::ModifierMap;
use crate::record::{ActorKind, ActorRecord};

pub(super) fn derive_encumbrance(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    flags: EffectiveFlags,
    abilities: &BTreeMap<AbilityId, Ability>,
) -> Encumbrance {
    let rules = &config.encumbrance;

    let mut value: f64 = record
        .items
        .iter()
        .filter(|item| item.system.is_physical())
        .map(|item| f64::from(item.quantity) * finite(item.weight).max(0.0))
        .sum();
    if rules.currency_weight && rules.coins_per_unit > 0.0 {
        let coins: u32 = record.currency.values().sum();
        value += f64::from(coins) / rules.coins_per_unit;
    }

    let value = finite(value);
    let max = finite(if record.kind == ActorKind::Vehicle {
        modifiers.number("attributes.capacity.cargo", record.attributes.cargo_capacity)
    } else {
        let strength = abilities.get(&rules.ability).map_or(0, |a| a.value);
        let mut size = rules
            .size_multipliers
            .get(&record.traits.size)
            .copied()
            .unwrap_or(1.0);
        if flags.powerful_build {
            size = (size * 2.0).min(rules.powerful_build_cap);
        }
        f64::from(strength) * size * rules.strength_multiplier
    });

    let pct = if max > 0.0 {
        finite(value / max * 100.0).clamp(0.0, 100.0)
    } else if value > 0.0 {
        100.0
    } else {
        0.0
    };

    Encumbrance {
        value,
        max,
        pct,
        encumbered: pct > rules.encumbered_pct,
    }
}

/// Non-finite weights and capacities count as zero.
fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
