//! Derivation pipeline.
//!
//! One pass turns a stored record plus its modifiers into a [`DerivedActor`]:
//!
//! ```text
//! Base Stage      prepare_base: synthesize missing keys, reset AC accumulator
//! Modifiers       suppression pre-pass, then per-path ordered stacks
//! Derived Stage   proficiency -> abilities -> scale/roll data -> skills -> AC
//!                 -> encumbrance -> initiative -> powercasting -> superiority
//!                 -> starship / npc blocks -> hit points
//! ```
//!
//! Each stage reads only the record, the resolved modifiers and the outputs of
//! earlier stages. No stage writes a pool's `current` value: maxima are
//! recomputed, currents are read from the record and clamped into the view.
//! Running the pass twice on the same inputs therefore yields the same result
//! and, after the first patch is applied, no further patch.
//!
//! The pass never fails. Problems it can recover from (bad formulas, duplicate
//! equipment) are collected in [`Derivation::warnings`].

mod abilities;
mod armor;
pub mod base;
mod details;
mod encumbrance;
mod powercasting;
mod skills;
mod starship;
mod superiority;

use std::collections::BTreeMap;

pub use base::{AcAccumulator, BaseOutput, prepare_base};

use crate::config::{CasterTrack, PowerLevel, RulesetConfig};
use crate::error::{ErrorSeverity, RulesError};
use crate::formula::{FormulaError, RollData};
use crate::ids::{AbilityId, ItemId, SkillId};
use crate::modifiers::{Modifier, ModifierMap, resolve_suppression};
use crate::pools::{DicePool, PoolKind, ResourcePool};
use crate::proficiency::{Proficiency, ProficiencyMultiplier};
use crate::record::{AcCalc, ActorKind, ActorRecord, ScaleValue, SizeCategory, Subsystem};
use crate::update::ActorUpdate;

// ============================================================================
// Derived Values
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ability {
    pub value: i32,
    pub modifier: i32,
    /// Saving throw proficiency multiplier after modifiers.
    pub proficient: ProficiencyMultiplier,
    pub save_prof: Proficiency,
    pub save: i32,
    pub dc: i32,
    pub check_bonus: i32,
    pub save_bonus: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Skill {
    /// Effective proficiency multiplier, after the competence floors.
    pub value: ProficiencyMultiplier,
    pub ability: AbilityId,
    pub bonus: i32,
    pub modifier: i32,
    pub prof: Proficiency,
    pub total: i32,
    pub passive: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArmorClass {
    pub calc: AcCalc,
    /// Base contribution of the selected calculation.
    pub armor: i32,
    pub shield: i32,
    pub bonus: i32,
    pub cover: i32,
    pub value: i32,
    /// Authoritative body armor, if one is equipped.
    pub equipped_armor: Option<ItemId>,
    pub equipped_shield: Option<ItemId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Encumbrance {
    pub value: f64,
    pub max: f64,
    /// Percentage of capacity, clamped to `[0, 100]`.
    pub pct: f64,
    pub encumbered: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Initiative {
    pub modifier: i32,
    pub bonus: i32,
    pub prof: Proficiency,
    pub check_bonus: i32,
    pub total: i32,
}

/// Rule flags after modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectiveFlags {
    pub broad_competence: bool,
    pub adaptive_competence: bool,
    pub powerful_build: bool,
}

/// Hit points, or hull points for starships.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitPoints {
    pub pool: ResourcePool,
    pub temp: i32,
    pub temp_max: i32,
}

impl Default for HitPoints {
    fn default() -> Self {
        Self {
            pool: ResourcePool::new(PoolKind::HitPoints, 0, 0),
            temp: 0,
            temp_max: 0,
        }
    }
}

/// Progression of one caster track.
#[derive(Clone, Debug, PartialEq)]
pub struct Powercasting {
    pub track: CasterTrack,
    pub caster_level: f64,
    pub points: ResourcePool,
    pub known: u32,
    pub max_power_level: u32,
    /// Slot maxima and costs for each castable power level.
    pub levels: BTreeMap<u32, PowerLevel>,
    /// Progression of the class with the most levels in this track.
    pub limit: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Superiority {
    pub level: f64,
    pub known: u32,
    pub dice: ResourcePool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StarshipBlock {
    pub size: SizeCategory,
    pub tier: u32,
    pub hull_dice: ResourcePool,
    pub shield_dice: ResourcePool,
    pub power_die: u32,
    pub power_dice: BTreeMap<Subsystem, ResourcePool>,
    pub damage_reduction: i32,
    pub armor_bonus: i32,
    pub shield_points: ResourcePool,
    /// Shield points regenerated per regeneration tick.
    pub shield_regen: u32,
    pub fuel_cost: u32,
    /// Power dice produced by a recharge repair.
    pub power_recovery: u32,
    pub shields_depleted: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NpcDetails {
    pub cr: f64,
    pub xp: u32,
}

/// Fully derived runtime view of an actor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedActor {
    pub kind: ActorKind,
    /// Proficiency bonus.
    pub prof: i32,
    pub flags: EffectiveFlags,
    pub abilities: BTreeMap<AbilityId, Ability>,
    pub skills: BTreeMap<SkillId, Skill>,
    pub ac: ArmorClass,
    pub encumbrance: Encumbrance,
    pub initiative: Initiative,
    pub hp: HitPoints,
    pub hit_dice: Option<ResourcePool>,
    /// Scale values keyed `<class>.<identifier>`.
    pub scale: BTreeMap<String, ScaleValue>,
    pub powercasting: BTreeMap<CasterTrack, Powercasting>,
    pub superiority: Option<Superiority>,
    pub starship: Option<StarshipBlock>,
    pub npc: Option<NpcDetails>,
    /// Values available to `@` references in formulas.
    pub roll_data: RollData,
}

impl DerivedActor {
    pub fn ability_mod(&self, ability: &AbilityId) -> i32 {
        self.abilities.get(ability).map_or(0, |a| a.modifier)
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Equipment slot that admits one authoritative item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ItemSlot {
    BodyArmor,
    Shield,
    StarshipSize,
    StarshipArmor,
    StarshipShield,
    Reactor,
    PowerCoupling,
}

/// Non-fatal problem recorded during a derivation pass.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DerivationWarning {
    #[error("formula '{formula}' for {context} failed: {error}")]
    FormulaEvaluation {
        context: String,
        formula: String,
        error: FormulaError,
    },

    #[error("duplicate {slot}: kept {kept}, ignored {ignored}")]
    DuplicateAuthoritativeItem {
        slot: ItemSlot,
        kept: ItemId,
        ignored: ItemId,
    },

    #[error("unknown armor class calculation '{calc}'")]
    UnknownArmorCalc { calc: String },
}

impl RulesError for DerivationWarning {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::FormulaEvaluation { .. } => "FORMULA_EVALUATION",
            Self::DuplicateAuthoritativeItem { .. } => "DUPLICATE_AUTHORITATIVE_ITEM",
            Self::UnknownArmorCalc { .. } => "UNKNOWN_ARMOR_CALC",
        }
    }
}

/// Pick the first item of a slot and warn about every further one.
pub(crate) fn first_authoritative<'a, T>(
    slot: ItemSlot,
    mut items: impl Iterator<Item = (&'a ItemId, T)>,
    warnings: &mut Vec<DerivationWarning>,
) -> Option<(&'a ItemId, T)> {
    let first = items.next()?;
    for (ignored, _) in items {
        warnings.push(DerivationWarning::DuplicateAuthoritativeItem {
            slot,
            kept: first.0.clone(),
            ignored: ignored.clone(),
        });
    }
    Some(first)
}

// ============================================================================
// Pass
// ============================================================================

/// Output of one derivation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivation {
    /// Record after the Base Stage (the stored record with the patch applied).
    pub record: ActorRecord,
    pub actor: DerivedActor,
    /// Persistable patch; `None` when nothing was synthesized.
    pub patch: Option<ActorUpdate>,
    pub warnings: Vec<DerivationWarning>,
}

/// Run a full derivation pass.
pub fn derive(record: &ActorRecord, modifiers: &[Modifier], config: &RulesetConfig) -> Derivation {
    let BaseOutput { record, ac, patch } = prepare_base(record, config);

    if !record.kind.has_statistics() {
        return Derivation {
            actor: DerivedActor {
                kind: record.kind,
                ..DerivedActor::default()
            },
            record,
            patch,
            warnings: Vec::new(),
        };
    }

    let modifiers = ModifierMap::resolve(&resolve_suppression(&record, modifiers));
    let mut warnings = Vec::new();

    let flags = EffectiveFlags {
        broad_competence: modifiers.flag("flags.broadCompetence", record.flags.broad_competence),
        adaptive_competence: modifiers
            .flag("flags.adaptiveCompetence", record.flags.adaptive_competence),
        powerful_build: modifiers.flag("flags.powerfulBuild", record.flags.powerful_build),
    };

    let prof = details::proficiency_bonus(&record, &modifiers, config);
    let abilities = abilities::derive_abilities(&record, &modifiers, config, prof);
    let scale = details::scale_values(&record);
    let mut roll_data = details::roll_data(&record, prof, &abilities, &scale);

    let skills = skills::derive_skills(&record, &modifiers, config, prof, flags, &abilities);
    for (id, skill) in &skills {
        roll_data.insert_number(format!("skills.{id}.total"), f64::from(skill.total));
        roll_data.insert_number(format!("skills.{id}.passive"), f64::from(skill.passive));
    }

    let ac = armor::derive_armor_class(
        &record,
        ac,
        &modifiers,
        config,
        &abilities,
        &roll_data,
        &mut warnings,
    );
    roll_data.insert_number("attributes.ac.value", f64::from(ac.value));

    let encumbrance = encumbrance::derive_encumbrance(&record, &modifiers, config, flags, &abilities);

    let initiative =
        skills::derive_initiative(&record, &modifiers, config, prof, flags, &abilities);
    roll_data.insert_number("attributes.init.total", f64::from(initiative.total));

    let powercasting = if record.kind.is_caster_capable() {
        powercasting::derive_powercasting(&record, &modifiers, config, &abilities)
    } else {
        BTreeMap::new()
    };
    for (track, casting) in &powercasting {
        roll_data.insert_number(
            format!("attributes.{track}.level"),
            casting.caster_level.floor(),
        );
        roll_data.insert_number(
            format!("attributes.{track}.points.max"),
            f64::from(casting.points.max()),
        );
    }

    let superiority = if record.kind.is_caster_capable() {
        superiority::derive_superiority(&record, &modifiers, config)
    } else {
        None
    };

    let starship = (record.kind == ActorKind::Starship)
        .then(|| starship::derive_starship(&record, config, &mut warnings))
        .flatten();

    let npc = (record.kind == ActorKind::Npc).then(|| NpcDetails {
        cr: record.details.cr,
        xp: config.xp_for_challenge(record.details.cr),
    });

    let hp_kind = if record.kind == ActorKind::Starship {
        PoolKind::HullPoints
    } else {
        PoolKind::HitPoints
    };
    let hp_max = modifiers.int("attributes.hp.max", record.attributes.hp.max);
    let hp = HitPoints {
        pool: ResourcePool::from_signed(hp_kind, record.attributes.hp.value, hp_max),
        temp: record.attributes.hp.temp.max(0),
        temp_max: record.attributes.hp.temp_max.max(0),
    };

    let hit_dice = matches!(record.kind, ActorKind::Character | ActorKind::Npc)
        .then(|| DicePool::hit_dice(&record).summary());

    let actor = DerivedActor {
        kind: record.kind,
        prof,
        flags,
        abilities,
        skills,
        ac,
        encumbrance,
        initiative,
        hp,
        hit_dice,
        scale,
        powercasting,
        superiority,
        starship,
        npc,
        roll_data,
    };

    Derivation {
        record,
        actor,
        patch,
        warnings,
    }
}

#[cfg(test)]
mod tests;
