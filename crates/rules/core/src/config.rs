//! Ruleset configuration.
//!
//! Every stage of the derivation pipeline receives one immutable
//! [`RulesetConfig`]. Nothing in the engine consults a global table: ability
//! lists, skill mappings, progression tables and rest ratios all come from here,
//! so the engine itself stays agnostic of the rules data.
//!
//! [`RulesetConfig::standard`] (also the `Default`) is a complete built-in
//! ruleset. Loaders in `rules-content` deserialize the same shape and fall back
//! to the standard values for any section a file omits.

use std::collections::BTreeMap;

use crate::ids::{AbilityId, SkillId};
use crate::record::SizeCategory;

/// One of the two independent powercasting progressions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum CasterTrack {
    Force,
    Tech,
}

/// Complete, immutable rules data for one derivation pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RulesetConfig {
    /// Ability keys every actor must carry after the Base Stage.
    pub abilities: Vec<AbilityId>,
    /// Skill keys and their default governing ability.
    pub skills: BTreeMap<SkillId, AbilityId>,
    /// Proficiency bonus indexed by total character level.
    pub proficiency_by_level: Vec<i32>,
    /// Proficiency bonus indexed by starship tier.
    pub proficiency_by_tier: Vec<i32>,
    pub challenge_xp: Vec<ChallengeXp>,
    /// Ability added to hit-die and hull-die rolls.
    pub hit_die_ability: AbilityId,
    pub initiative_ability: AbilityId,
    pub encumbrance: EncumbranceRules,
    pub armor_class: ArmorClassRules,
    pub competence: CompetenceRules,
    pub caster_tracks: BTreeMap<CasterTrack, CasterTrackRules>,
    pub superiority: SuperiorityRules,
    pub starship: StarshipRules,
    pub rest: RestRules,
}

impl RulesetConfig {
    /// The built-in ruleset.
    pub fn standard() -> Self {
        let abilities = ["str", "dex", "con", "int", "wis", "cha"]
            .into_iter()
            .map(AbilityId::from)
            .collect();

        let skills = [
            ("acr", "dex"),
            ("ani", "wis"),
            ("ath", "str"),
            ("dec", "cha"),
            ("ins", "wis"),
            ("itm", "cha"),
            ("inv", "int"),
            ("lor", "int"),
            ("med", "wis"),
            ("nat", "int"),
            ("pil", "int"),
            ("prc", "wis"),
            ("prf", "cha"),
            ("per", "cha"),
            ("slt", "dex"),
            ("ste", "dex"),
            ("sur", "wis"),
            ("tec", "int"),
        ]
        .into_iter()
        .map(|(skill, ability)| (SkillId::from(skill), AbilityId::from(ability)))
        .collect();

        // floor((level + 7) / 4), with level 0 treated as level 1.
        let proficiency_by_level = (0..=20).map(|level: i32| (level.max(1) + 7) / 4).collect();
        let proficiency_by_tier = vec![2, 3, 4, 5, 6, 6];

        let challenge_xp = [
            (0.0, 10),
            (0.125, 25),
            (0.25, 50),
            (0.5, 100),
            (1.0, 200),
            (2.0, 450),
            (3.0, 700),
            (4.0, 1100),
            (5.0, 1800),
            (6.0, 2300),
            (7.0, 2900),
            (8.0, 3900),
            (9.0, 5000),
            (10.0, 5900),
            (11.0, 7200),
            (12.0, 8400),
            (13.0, 10000),
            (14.0, 11500),
            (15.0, 13000),
            (16.0, 15000),
            (17.0, 18000),
            (18.0, 20000),
            (19.0, 22000),
            (20.0, 25000),
            (21.0, 33000),
            (22.0, 41000),
            (23.0, 50000),
            (24.0, 62000),
            (25.0, 75000),
            (26.0, 90000),
            (27.0, 105000),
            (28.0, 120000),
            (29.0, 135000),
            (30.0, 155000),
        ]
        .into_iter()
        .map(|(cr, xp)| ChallengeXp { cr, xp })
        .collect();

        let caster_tracks = [
            (CasterTrack::Force, CasterTrackRules::standard_force()),
            (CasterTrack::Tech, CasterTrackRules::standard_tech()),
        ]
        .into_iter()
        .collect();

        Self {
            abilities,
            skills,
            proficiency_by_level,
            proficiency_by_tier,
            challenge_xp,
            hit_die_ability: AbilityId::from("con"),
            initiative_ability: AbilityId::from("dex"),
            encumbrance: EncumbranceRules::default(),
            armor_class: ArmorClassRules::default(),
            competence: CompetenceRules::default(),
            caster_tracks,
            superiority: SuperiorityRules::default(),
            starship: StarshipRules::default(),
            rest: RestRules::default(),
        }
    }

    /// Proficiency bonus for a total character level.
    pub fn proficiency_for_level(&self, level: u32) -> i32 {
        lookup(&self.proficiency_by_level, level as usize)
    }

    /// Proficiency bonus for a starship tier.
    pub fn proficiency_for_tier(&self, tier: u32) -> i32 {
        lookup(&self.proficiency_by_tier, tier as usize)
    }

    /// XP award for a challenge rating.
    ///
    /// Uses the highest table entry not above `cr`; ratings below the table
    /// award nothing.
    pub fn xp_for_challenge(&self, cr: f64) -> u32 {
        self.challenge_xp
            .iter()
            .filter(|entry| entry.cr <= cr + f64::EPSILON)
            .max_by(|a, b| a.cr.total_cmp(&b.cr))
            .map_or(0, |entry| entry.xp)
    }
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Table lookup that saturates at the last entry.
///
/// Progression tables are indexed by level; levels past the end of a table keep
/// the final value, and an empty table yields the type's default.
pub fn lookup<T: Copy + Default>(table: &[T], index: usize) -> T {
    table
        .get(index)
        .or_else(|| table.last())
        .copied()
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChallengeXp {
    pub cr: f64,
    pub xp: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EncumbranceRules {
    /// Ability whose score drives carrying capacity.
    pub ability: AbilityId,
    /// Weight units carried per point of the ability score.
    pub strength_multiplier: f64,
    pub size_multipliers: BTreeMap<SizeCategory, f64>,
    /// Upper bound on the size multiplier after the powerful-build doubling.
    pub powerful_build_cap: f64,
    /// Percentage above which the actor counts as encumbered.
    pub encumbered_pct: f64,
    pub currency_weight: bool,
    /// Coins per weight unit.
    pub coins_per_unit: f64,
}

impl Default for EncumbranceRules {
    fn default() -> Self {
        let size_multipliers = [
            (SizeCategory::Tiny, 0.5),
            (SizeCategory::Small, 1.0),
            (SizeCategory::Medium, 1.0),
            (SizeCategory::Large, 2.0),
            (SizeCategory::Huge, 4.0),
            (SizeCategory::Gargantuan, 8.0),
        ]
        .into_iter()
        .collect();

        Self {
            ability: AbilityId::from("str"),
            strength_multiplier: 15.0,
            size_multipliers,
            powerful_build_cap: 8.0,
            encumbered_pct: 66.67,
            currency_weight: true,
            coins_per_unit: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ArmorClassRules {
    /// Ability added to armor (up to its cap) and to starship AC.
    pub ability: AbilityId,
    /// Unarmored formula used by the `default` mode.
    pub unarmored: String,
    /// Base value for the `starship` mode before dexterity and hull plating.
    pub starship_base: i32,
    /// Class-specific named formulas selectable through `calc`.
    pub formulas: BTreeMap<String, String>,
}

impl Default for ArmorClassRules {
    fn default() -> Self {
        let formulas = [
            ("mage", "13 + @abilities.dex.mod"),
            ("draconic", "13 + @abilities.dex.mod"),
            (
                "unarmored-monk",
                "10 + @abilities.dex.mod + @abilities.wis.mod",
            ),
            (
                "unarmored-bard",
                "10 + @abilities.dex.mod + @abilities.cha.mod",
            ),
            (
                "unarmored-barb",
                "10 + @abilities.dex.mod + @abilities.con.mod",
            ),
        ]
        .into_iter()
        .map(|(name, formula)| (name.to_owned(), formula.to_owned()))
        .collect();

        Self {
            ability: AbilityId::from("dex"),
            unarmored: "10 + @abilities.dex.mod".to_owned(),
            starship_base: 10,
            formulas,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CompetenceRules {
    /// Abilities covered by the adaptive-competence flag.
    pub adaptive_abilities: Vec<AbilityId>,
}

impl Default for CompetenceRules {
    fn default() -> Self {
        Self {
            adaptive_abilities: ["str", "dex", "con"]
                .into_iter()
                .map(AbilityId::from)
                .collect(),
        }
    }
}

/// Progression data for one caster track.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CasterTrackRules {
    /// Halve the final point total (rounded down).
    pub halve_points: bool,
    /// The best modifier among these abilities is added to the point total.
    pub point_abilities: Vec<AbilityId>,
    /// Progression used for NPC caster levels.
    pub npc_progression: String,
    pub progressions: BTreeMap<String, ProgressionSpec>,
    /// Highest power level castable, indexed by caster level.
    pub max_power_level: Vec<u32>,
    /// Per-power-level maxima, indexed by caster level. Row `n` lists the
    /// maximum for power levels 1, 2, ... at caster level `n`.
    pub slots: Vec<Vec<u32>>,
    /// A power of level `n` costs `n + point_cost_offset` points.
    pub point_cost_offset: u32,
}

impl Default for CasterTrackRules {
    fn default() -> Self {
        Self::standard_force()
    }
}

impl CasterTrackRules {
    fn standard_max_power_level() -> Vec<u32> {
        vec![
            0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 9, 9,
        ]
    }

    fn standard_slots() -> Vec<Vec<u32>> {
        vec![
            vec![],
            vec![2],
            vec![3],
            vec![4, 2],
            vec![4, 3],
            vec![4, 3, 2],
            vec![4, 3, 3],
            vec![4, 3, 3, 1],
            vec![4, 3, 3, 2],
            vec![4, 3, 3, 3, 1],
            vec![4, 3, 3, 3, 2],
            vec![4, 3, 3, 3, 2, 1],
            vec![4, 3, 3, 3, 2, 1],
            vec![4, 3, 3, 3, 2, 1, 1],
            vec![4, 3, 3, 3, 2, 1, 1],
            vec![4, 3, 3, 3, 2, 1, 1, 1],
            vec![4, 3, 3, 3, 2, 1, 1, 1],
            vec![4, 3, 3, 3, 2, 1, 1, 1, 1],
            vec![4, 3, 3, 3, 3, 1, 1, 1, 1],
            vec![4, 3, 3, 3, 3, 2, 1, 1, 1],
            vec![4, 3, 3, 3, 3, 2, 2, 1, 1],
        ]
    }

    /// Slot maxima and point costs for power levels `1..=max_level`.
    pub fn power_levels(&self, caster_level: usize, max_level: u32) -> BTreeMap<u32, PowerLevel> {
        let row = self
            .slots
            .get(caster_level)
            .or_else(|| self.slots.last())
            .map_or(&[][..], Vec::as_slice);
        (1..=max_level)
            .map(|level| {
                let slots = row.get(level as usize - 1).copied().unwrap_or(0);
                let cost = level.saturating_add(self.point_cost_offset);
                (level, PowerLevel { slots, cost })
            })
            .collect()
    }

    pub fn standard_force() -> Self {
        let progressions = [
            (
                "full",
                ProgressionSpec::new(
                    4.0,
                    9,
                    vec![
                        0, 9, 11, 13, 15, 17, 19, 21, 23, 25, 26, 28, 29, 31, 32, 34, 35, 37, 38,
                        39, 40,
                    ],
                ),
            ),
            (
                "three-quarter",
                ProgressionSpec::new(
                    3.0,
                    7,
                    vec![
                        0, 7, 9, 11, 13, 15, 17, 18, 19, 21, 22, 24, 25, 26, 28, 29, 30, 32, 33,
                        34, 35,
                    ],
                ),
            ),
            (
                "half",
                ProgressionSpec::new(
                    2.0,
                    5,
                    vec![
                        0, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22,
                        23,
                    ],
                ),
            ),
        ]
        .into_iter()
        .map(|(name, spec)| (name.to_owned(), spec))
        .collect();

        Self {
            halve_points: false,
            point_abilities: ["wis", "cha"].into_iter().map(AbilityId::from).collect(),
            npc_progression: "full".to_owned(),
            progressions,
            max_power_level: Self::standard_max_power_level(),
            slots: Self::standard_slots(),
            point_cost_offset: 1,
        }
    }

    pub fn standard_tech() -> Self {
        let progressions = [
            (
                "full",
                ProgressionSpec::new(
                    4.0,
                    9,
                    vec![
                        0, 6, 7, 9, 10, 12, 13, 15, 16, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23,
                        23, 24,
                    ],
                ),
            ),
            (
                "half",
                ProgressionSpec::new(
                    2.0,
                    5,
                    vec![
                        0, 0, 4, 5, 6, 7, 8, 9, 10, 11, 12, 12, 13, 13, 14, 14, 15, 15, 16, 16,
                        17,
                    ],
                ),
            ),
        ]
        .into_iter()
        .map(|(name, spec)| (name.to_owned(), spec))
        .collect();

        Self {
            halve_points: true,
            point_abilities: vec![AbilityId::from("int")],
            npc_progression: "full".to_owned(),
            progressions,
            max_power_level: Self::standard_max_power_level(),
            slots: Self::standard_slots(),
            point_cost_offset: 1,
        }
    }
}

/// Limits for one power level of a caster track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerLevel {
    /// Maximum castings at this level.
    pub slots: u32,
    /// Points spent per casting.
    pub cost: u32,
}

/// One progression tier (`full`, `half`, ...) within a caster track.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProgressionSpec {
    pub points_per_level: f64,
    /// Highest power level this progression reaches at class level 20.
    pub max_power_level: u32,
    /// Powers known, indexed by class level.
    pub known: Vec<u32>,
}

impl ProgressionSpec {
    pub fn new(points_per_level: f64, max_power_level: u32, known: Vec<u32>) -> Self {
        Self {
            points_per_level,
            max_power_level,
            known,
        }
    }

    /// Caster levels contributed per class level.
    pub fn caster_level_rate(&self) -> f64 {
        f64::from(self.max_power_level) / 9.0
    }
}

/// Superiority tables, indexed by the level-weighted superiority level.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SuperiorityRules {
    pub known: Vec<u32>,
    pub dice: Vec<u32>,
    pub die_size: Vec<u32>,
}

impl Default for SuperiorityRules {
    fn default() -> Self {
        Self {
            known: vec![
                0, 0, 3, 3, 3, 5, 5, 7, 7, 7, 9, 9, 9, 9, 11, 11, 11, 11, 11, 13, 13,
            ],
            dice: vec![
                0, 0, 2, 2, 2, 3, 3, 3, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 6, 6, 6,
            ],
            die_size: vec![
                0, 0, 4, 4, 4, 4, 6, 6, 6, 6, 8, 8, 8, 8, 10, 10, 10, 10, 12, 12, 12,
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StarshipRules {
    pub sizes: BTreeMap<SizeCategory, StarshipSizeSpec>,
    /// Power die size indexed by tier.
    pub power_die_by_tier: Vec<u32>,
    /// Central power-dice capacity when no power coupling is installed.
    pub default_central_capacity: u32,
    /// Per-subsystem capacity when no power coupling is installed.
    pub default_system_capacity: u32,
}

impl StarshipRules {
    pub fn size(&self, size: SizeCategory) -> StarshipSizeSpec {
        self.sizes.get(&size).copied().unwrap_or_default()
    }
}

impl Default for StarshipRules {
    fn default() -> Self {
        let sizes = [
            (SizeCategory::Tiny, StarshipSizeSpec::new(4, 4, 1, 1, 1)),
            (SizeCategory::Small, StarshipSizeSpec::new(6, 6, 3, 3, 1)),
            (SizeCategory::Medium, StarshipSizeSpec::new(8, 8, 5, 5, 1)),
            (SizeCategory::Large, StarshipSizeSpec::new(10, 10, 7, 7, 1)),
            (SizeCategory::Huge, StarshipSizeSpec::new(12, 12, 9, 9, 2)),
            (
                SizeCategory::Gargantuan,
                StarshipSizeSpec::new(20, 20, 11, 11, 2),
            ),
        ]
        .into_iter()
        .collect();

        Self {
            sizes,
            power_die_by_tier: vec![4, 4, 6, 8, 10, 12],
            default_central_capacity: 4,
            default_system_capacity: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StarshipSizeSpec {
    pub hull_die: u32,
    pub shield_die: u32,
    pub hull_dice_start: u32,
    pub shield_dice_start: u32,
    /// Dice granted per tier (doubled for the largest hulls).
    pub tier_multiplier: u32,
}

impl StarshipSizeSpec {
    pub const fn new(
        hull_die: u32,
        shield_die: u32,
        hull_dice_start: u32,
        shield_dice_start: u32,
        tier_multiplier: u32,
    ) -> Self {
        Self {
            hull_die,
            shield_die,
            hull_dice_start,
            shield_dice_start,
            tier_multiplier,
        }
    }

    pub const fn hull_dice(&self, tier: u32) -> u32 {
        self.hull_dice_start
            .saturating_add(tier.saturating_mul(self.tier_multiplier))
    }

    pub const fn shield_dice(&self, tier: u32) -> u32 {
        self.shield_dice_start
            .saturating_add(tier.saturating_mul(self.tier_multiplier))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RestRules {
    /// Fraction of total hit dice regained on a long rest (minimum one).
    /// `1.0`, the default, recovers every die.
    pub hit_dice_ratio: f64,
    /// Fraction of total hull dice regained on a refitting repair (minimum one).
    /// `1.0`, the default, recovers every die.
    pub hull_dice_ratio: f64,
    /// Default HP threshold for automatic die spending.
    pub auto_dice_threshold: u32,
}

impl Default for RestRules {
    fn default() -> Self {
        Self {
            hit_dice_ratio: 1.0,
            hull_dice_ratio: 1.0,
            auto_dice_threshold: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_saturates() {
        assert_eq!(lookup(&[1, 2, 3], 1), 2);
        assert_eq!(lookup(&[1, 2, 3], 7), 3);
        assert_eq!(lookup::<u32>(&[], 2), 0);
    }

    #[test]
    fn standard_proficiency_table() {
        let config = RulesetConfig::standard();
        assert_eq!(config.proficiency_for_level(0), 2);
        assert_eq!(config.proficiency_for_level(4), 2);
        assert_eq!(config.proficiency_for_level(5), 3);
        assert_eq!(config.proficiency_for_level(17), 6);
        assert_eq!(config.proficiency_for_level(25), 6);
    }

    #[test]
    fn challenge_xp_handles_fractions() {
        let config = RulesetConfig::standard();
        assert_eq!(config.xp_for_challenge(0.25), 50);
        assert_eq!(config.xp_for_challenge(5.0), 1800);
        assert_eq!(config.xp_for_challenge(5.5), 1800);
        assert_eq!(config.xp_for_challenge(-1.0), 0);
    }

    #[test]
    fn large_hulls_double_tier_grant() {
        let rules = StarshipRules::default();
        assert_eq!(rules.size(SizeCategory::Medium).hull_dice(2), 7);
        assert_eq!(rules.size(SizeCategory::Huge).hull_dice(2), 13);
    }
}
