//! Starship subsystem block.
//!
//! Derived only for starships that own a size item. The first size item and
//! the first installed component of each kind are authoritative; any further
//! ones are reported as duplicates and ignored.

use std::collections::BTreeMap;

use strum::IntoEnumIterator;

use super::{DerivationWarning, ItemSlot, StarshipBlock, first_authoritative};
use crate::config::{RulesetConfig, lookup};
use crate::pools::{DicePool, PoolKind, ResourcePool};
use crate::record::{ActorRecord, StarshipComponent, Subsystem};

pub(super) fn derive_starship(
    record: &ActorRecord,
    config: &RulesetConfig,
    warnings: &mut Vec<DerivationWarning>,
) -> Option<StarshipBlock> {
    let (_, size) = first_authoritative(
        ItemSlot::StarshipSize,
        record.starship_sizes().map(|(item, size)| (&item.id, size)),
        warnings,
    )?;
    let spec = config.starship.size(size.size);
    let tier = record.details.tier;

    let components = move || record.installed_components();
    let armor = first_authoritative(
        ItemSlot::StarshipArmor,
        components().filter_map(|(item, part)| match part {
            StarshipComponent::Armor { ac_bonus, dr } => Some((&item.id, (*ac_bonus, *dr))),
            _ => None,
        }),
        warnings,
    );
    let shield = first_authoritative(
        ItemSlot::StarshipShield,
        components().filter_map(|(item, part)| match part {
            StarshipComponent::Shield {
                capacity_multiplier,
                regen_multiplier,
            } => Some((&item.id, (*capacity_multiplier, *regen_multiplier))),
            _ => None,
        }),
        warnings,
    );
    let reactor = first_authoritative(
        ItemSlot::Reactor,
        components().filter_map(|(item, part)| match part {
            StarshipComponent::Reactor {
                fuel_cost,
                power_recovery,
            } => Some((&item.id, (*fuel_cost, *power_recovery))),
            _ => None,
        }),
        warnings,
    );
    let coupling = first_authoritative(
        ItemSlot::PowerCoupling,
        components().filter_map(|(item, part)| match part {
            StarshipComponent::PowerCoupling {
                central_capacity,
                system_capacity,
            } => Some((&item.id, (*central_capacity, *system_capacity))),
            _ => None,
        }),
        warnings,
    );

    let hull_dice = DicePool::hull_dice(record, config).summary();
    let shield_dice = DicePool::shield_dice(record, config).summary();

    let power_die = lookup(&config.starship.power_die_by_tier, tier as usize);
    let (central, system) = coupling.map_or(
        (
            config.starship.default_central_capacity,
            config.starship.default_system_capacity,
        ),
        |(_, capacities)| capacities,
    );
    let power_dice: BTreeMap<Subsystem, ResourcePool> = Subsystem::iter()
        .map(|subsystem| {
            let max = if subsystem == Subsystem::Central {
                central
            } else {
                system
            };
            let current = record
                .attributes
                .power_dice
                .get(&subsystem)
                .copied()
                .unwrap_or(0);
            let pool = ResourcePool::new(PoolKind::PowerDice(subsystem), current, max)
                .with_denomination(power_die);
            (subsystem, pool)
        })
        .collect();

    let (armor_bonus, damage_reduction) = armor.map_or((0, 0), |(_, values)| values);
    let (capacity, shield_regen) = match shield {
        Some((_, (capacity_multiplier, regen_multiplier))) => {
            let capacity = f64::from(shield_dice.max() * spec.shield_die) * capacity_multiplier;
            let regen = f64::from(spec.shield_die) * regen_multiplier;
            (capacity.floor().max(0.0) as u32, regen.floor().max(0.0) as u32)
        }
        None => (0, 0),
    };
    let (fuel_cost, power_recovery) = reactor.map_or((0, 0), |(_, values)| values);

    Some(StarshipBlock {
        size: size.size,
        tier,
        hull_dice,
        shield_dice,
        power_die,
        power_dice,
        damage_reduction,
        armor_bonus,
        shield_points: ResourcePool::new(
            PoolKind::ShieldPoints,
            record.attributes.shield_points,
            capacity,
        ),
        shield_regen,
        fuel_cost,
        power_recovery,
        shields_depleted: record.attributes.shields_depleted,
    })
}
