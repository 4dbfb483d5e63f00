//! Ability scores, saves and DCs.

use std::collections::BTreeMap;

use super::Ability;
use crate::config::RulesetConfig;
use crate::ids::AbilityId;
use crate::modifiers::ModifierMap;
use crate::proficiency::{Proficiency, ProficiencyMultiplier};
use crate::record::ActorRecord;

/// `floor((value - 10) / 2)`, rounding toward negative infinity for low scores.
pub fn ability_modifier(value: i32) -> i32 {
    value.saturating_sub(10).div_euclid(2)
}

pub(super) fn derive_abilities(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    prof: i32,
) -> BTreeMap<AbilityId, Ability> {
    let global_check = modifiers.int("bonuses.abilities.check", 0);
    let global_save = modifiers.int("bonuses.abilities.save", 0);

    // Configured abilities first; stored extras are derived too.
    let mut ids: Vec<&AbilityId> = config.abilities.iter().collect();
    ids.extend(record.abilities.keys().filter(|id| !config.abilities.contains(*id)));

    ids.into_iter()
        .filter_map(|id| record.abilities.get(id).map(|data| (id, data)))
        .map(|(id, data)| {
            let path = |leaf: &str| format!("abilities.{id}.{leaf}");

            let value = modifiers.int(&path("value"), data.value);
            let proficient = ProficiencyMultiplier::from_f64(
                modifiers.number(&path("proficient"), data.proficient.as_f64()),
            );
            let check_bonus = modifiers
                .int(&path("bonuses.check"), data.bonuses.check)
                .saturating_add(global_check);
            let save_bonus = modifiers
                .int(&path("bonuses.save"), data.bonuses.save)
                .saturating_add(global_save);
            let dc_bonus = modifiers.int(&path("bonuses.dc"), data.bonuses.dc);

            let modifier = ability_modifier(value);
            let save_prof = Proficiency::new(prof, proficient);

            let ability = Ability {
                value,
                modifier,
                proficient,
                save_prof,
                save: modifier
                    .saturating_add(save_bonus)
                    .saturating_add(save_prof.flat()),
                dc: 8i32
                    .saturating_add(modifier)
                    .saturating_add(prof)
                    .saturating_add(dc_bonus),
                check_bonus,
                save_bonus,
            };
            (id.clone(), ability)
        })
        .collect()
}
