//! Skills and initiative.
//!
//! Both share the competence floors: `broadCompetence` raises every skill (and
//! initiative) to at least half proficiency, `adaptiveCompetence` does the same
//! for the abilities listed in the ruleset. The floors are independent maxima,
//! so applying both is the same as applying either.

use std::collections::BTreeMap;

use super::{Ability, EffectiveFlags, Initiative, Skill};
use crate::config::RulesetConfig;
use crate::ids::{AbilityId, SkillId};
use crate::modifiers::ModifierMap;
use crate::proficiency::{Proficiency, ProficiencyMultiplier};
use crate::record::ActorRecord;

fn competence_floor(
    value: ProficiencyMultiplier,
    ability: &AbilityId,
    flags: EffectiveFlags,
    config: &RulesetConfig,
) -> ProficiencyMultiplier {
    let adaptive =
        flags.adaptive_competence && config.competence.adaptive_abilities.contains(ability);
    if flags.broad_competence || adaptive {
        value.at_least_half()
    } else {
        value
    }
}

pub(super) fn derive_skills(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    prof: i32,
    flags: EffectiveFlags,
    abilities: &BTreeMap<AbilityId, Ability>,
) -> BTreeMap<SkillId, Skill> {
    let global_bonus = modifiers.int("bonuses.abilities.skill", 0);

    record
        .skills
        .iter()
        .map(|(id, data)| {
            let ability_id = if data.ability.is_empty() {
                config.skills.get(id).cloned().unwrap_or_default()
            } else {
                data.ability.clone()
            };
            let ability = abilities.get(&ability_id);

            let floored = competence_floor(data.value, &ability_id, flags, config);
            let value = ProficiencyMultiplier::from_f64(
                modifiers.number(&format!("skills.{id}.value"), floored.as_f64()),
            );
            let bonus = modifiers
                .int(&format!("skills.{id}.bonus"), data.bonus)
                .saturating_add(global_bonus);
            let modifier = ability.map_or(0, |a| a.modifier);
            let check_bonus = ability.map_or(0, |a| a.check_bonus);
            let prof = Proficiency::new(prof, value);
            let total = modifier
                .saturating_add(bonus)
                .saturating_add(check_bonus)
                .saturating_add(prof.flat());

            let skill = Skill {
                value,
                ability: ability_id,
                bonus,
                modifier,
                prof,
                total,
                passive: total.saturating_add(10),
            };
            (id.clone(), skill)
        })
        .collect()
}

pub(super) fn derive_initiative(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    prof: i32,
    flags: EffectiveFlags,
    abilities: &BTreeMap<AbilityId, Ability>,
) -> Initiative {
    let ability_id = &config.initiative_ability;
    let ability = abilities.get(ability_id);
    let multiplier = competence_floor(ProficiencyMultiplier::NONE, ability_id, flags, config);

    let modifier = ability.map_or(0, |a| a.modifier);
    let check_bonus = ability.map_or(0, |a| a.check_bonus);
    let bonus = modifiers.int("attributes.init.bonus", record.attributes.init.bonus);
    let prof = Proficiency::new(prof, multiplier);

    Initiative {
        modifier,
        bonus,
        prof,
        check_bonus,
        total: modifier
            .saturating_add(bonus)
            .saturating_add(prof.flat())
            .saturating_add(check_bonus),
    }
}
