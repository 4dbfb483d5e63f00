//! Base Stage.
//!
//! Makes the record complete before anything is derived from it: every ability
//! and skill the ruleset enumerates exists afterwards, and every skill names its
//! governing ability. Whatever had to be synthesized is returned as a patch so
//! the caller can persist it once; a complete record produces no patch.

use crate::config::RulesetConfig;
use crate::record::{AbilityData, ActorRecord, SkillData};
use crate::update::ActorUpdate;

/// Armor-class accumulator reset at the start of every pass.
///
/// Later stages add into these fields instead of special-casing a first write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcAccumulator {
    pub armor: i32,
    pub shield: i32,
    pub bonus: i32,
    pub cover: i32,
}

impl Default for AcAccumulator {
    fn default() -> Self {
        Self {
            armor: 10,
            shield: 0,
            bonus: 0,
            cover: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BaseOutput {
    pub record: ActorRecord,
    pub ac: AcAccumulator,
    pub patch: Option<ActorUpdate>,
}

/// Run the Base Stage.
///
/// Groups carry no statistics and pass through untouched.
pub fn prepare_base(record: &ActorRecord, config: &RulesetConfig) -> BaseOutput {
    let mut record = record.clone();
    let mut patch = ActorUpdate::default();

    if record.kind.has_statistics() {
        for ability in &config.abilities {
            if !record.abilities.contains_key(ability) {
                let data = AbilityData::default();
                record.abilities.insert(ability.clone(), data.clone());
                patch.abilities.insert(ability.clone(), data);
            }
        }

        for (skill, ability) in &config.skills {
            match record.skills.get_mut(skill) {
                None => {
                    let data = SkillData::new(ability.clone(), Default::default());
                    record.skills.insert(skill.clone(), data.clone());
                    patch.skills.insert(skill.clone(), data);
                }
                Some(data) if data.ability.is_empty() => {
                    data.ability = ability.clone();
                    patch.skills.insert(skill.clone(), data.clone());
                }
                Some(_) => {}
            }
        }
    }

    BaseOutput {
        record,
        ac: AcAccumulator::default(),
        patch: (!patch.is_empty()).then_some(patch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AbilityId, SkillId};
    use crate::record::ActorKind;

    #[test]
    fn synthesizes_missing_keys_once() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("pc", ActorKind::Character);
        record
            .abilities
            .insert(AbilityId::from("str"), AbilityData::with_value(16));

        let first = prepare_base(&record, &config);
        let patch = first.patch.clone().unwrap();
        assert_eq!(patch.abilities.len(), 5);
        assert!(!patch.abilities.contains_key(&AbilityId::from("str")));
        assert_eq!(patch.skills.len(), config.skills.len());
        assert_eq!(
            first.record.skills[&SkillId::from("ath")].ability,
            AbilityId::from("str")
        );

        let mut stored = record.clone();
        stored.apply_update(&patch);
        let second = prepare_base(&stored, &config);
        assert_eq!(second.patch, None);
        assert_eq!(second.record, first.record);
    }

    #[test]
    fn repairs_skill_without_ability() {
        let config = RulesetConfig::standard();
        let mut record = ActorRecord::new("pc", ActorKind::Npc);
        record.skills.insert(SkillId::from("ste"), SkillData::default());

        let output = prepare_base(&record, &config);
        let patch = output.patch.unwrap();
        assert_eq!(patch.skills[&SkillId::from("ste")].ability, AbilityId::from("dex"));
    }

    #[test]
    fn groups_pass_through() {
        let record = ActorRecord::new("party", ActorKind::Group);
        let output = prepare_base(&record, &RulesetConfig::standard());
        assert!(output.record.abilities.is_empty());
        assert_eq!(output.patch, None);
        assert_eq!(output.ac.armor, 10);
    }
}
