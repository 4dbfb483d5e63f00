//! Persisted actor records.
//!
//! These types mirror the stored shape of an actor: plain nested key-value data
//! that may be sparse. Every struct defaults its missing fields, and the Base
//! Stage fills in whatever the ruleset requires on top of that.
//!
//! Only persisted inputs live here. Everything computed from them belongs to
//! [`crate::derive`].

use std::collections::BTreeMap;

use crate::config::CasterTrack;
use crate::ids::{AbilityId, ActorId, ItemId, SkillId};
use crate::proficiency::ProficiencyMultiplier;

/// Kind of actor a record describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum ActorKind {
    #[default]
    Character,
    Npc,
    Starship,
    Vehicle,
    Group,
}

impl ActorKind {
    /// Groups carry no statistics of their own.
    pub const fn has_statistics(self) -> bool {
        !matches!(self, Self::Group)
    }

    pub const fn is_caster_capable(self) -> bool {
        matches!(self, Self::Character | Self::Npc)
    }
}

/// Creature and starship size categories.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeCategory {
    #[cfg_attr(feature = "serde", serde(rename = "tiny"))]
    #[strum(serialize = "tiny")]
    Tiny,
    #[cfg_attr(feature = "serde", serde(rename = "sm"))]
    #[strum(serialize = "sm")]
    Small,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "med"))]
    #[strum(serialize = "med")]
    Medium,
    #[cfg_attr(feature = "serde", serde(rename = "lg"))]
    #[strum(serialize = "lg")]
    Large,
    #[cfg_attr(feature = "serde", serde(rename = "huge"))]
    #[strum(serialize = "huge")]
    Huge,
    #[cfg_attr(feature = "serde", serde(rename = "grg"))]
    #[strum(serialize = "grg")]
    Gargantuan,
}

/// Starship subsystems that hold power dice.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum Subsystem {
    Central,
    Comms,
    Engines,
    Shields,
    Sensors,
    Weapons,
}

/// Root persisted entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ActorRecord {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub abilities: BTreeMap<AbilityId, AbilityData>,
    pub skills: BTreeMap<SkillId, SkillData>,
    pub attributes: AttributesData,
    pub details: Details,
    pub traits: Traits,
    /// Coin counts by denomination key.
    pub currency: BTreeMap<String, u32>,
    pub flags: ActorFlags,
    pub items: Vec<OwnedItem>,
}

impl ActorRecord {
    pub fn new(id: impl Into<ActorId>, kind: ActorKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn item(&self, id: &ItemId) -> Option<&OwnedItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut OwnedItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Class items paired with their owning item.
    pub fn classes(&self) -> impl Iterator<Item = (&OwnedItem, &ClassData)> {
        self.items.iter().filter_map(|item| match &item.system {
            ItemKind::Class(class) => Some((item, class)),
            _ => None,
        })
    }

    /// Sum of levels across all class items.
    pub fn total_class_levels(&self) -> u32 {
        self.classes()
            .fold(0u32, |total, (_, class)| total.saturating_add(class.levels))
    }

    /// Starship size items in ownership order. The first one is authoritative.
    pub fn starship_sizes(&self) -> impl Iterator<Item = (&OwnedItem, &StarshipSizeData)> {
        self.items.iter().filter_map(|item| match &item.system {
            ItemKind::StarshipSize(size) => Some((item, size)),
            _ => None,
        })
    }

    pub fn starship_size(&self) -> Option<(&OwnedItem, &StarshipSizeData)> {
        self.starship_sizes().next()
    }

    /// Installed starship components in ownership order.
    pub fn installed_components(&self) -> impl Iterator<Item = (&OwnedItem, &StarshipComponent)> {
        self.items.iter().filter_map(|item| match &item.system {
            ItemKind::StarshipEquipment(equipment) if item.equipped => Some((item, &equipment.part)),
            _ => None,
        })
    }
}

/// Stored part of an ability score.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct AbilityData {
    pub value: i32,
    /// Saving throw proficiency multiplier.
    pub proficient: ProficiencyMultiplier,
    pub bonuses: AbilityBonuses,
}

impl AbilityData {
    pub const DEFAULT_SCORE: i32 = 10;

    pub fn with_value(value: i32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

impl Default for AbilityData {
    fn default() -> Self {
        Self {
            value: Self::DEFAULT_SCORE,
            proficient: ProficiencyMultiplier::NONE,
            bonuses: AbilityBonuses::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AbilityBonuses {
    pub check: i32,
    pub save: i32,
    pub dc: i32,
}

/// Stored part of a skill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SkillData {
    /// Proficiency multiplier (0, 0.5, 1, 2).
    pub value: ProficiencyMultiplier,
    pub ability: AbilityId,
    pub bonus: i32,
}

impl SkillData {
    pub fn new(ability: impl Into<AbilityId>, value: ProficiencyMultiplier) -> Self {
        Self {
            value,
            ability: ability.into(),
            bonus: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct AttributesData {
    pub ac: ArmorClassData,
    pub hp: HitPointsData,
    pub init: InitiativeData,
    pub death: DeathSaves,
    /// Current powercasting points per caster track.
    pub points: BTreeMap<CasterTrack, u32>,
    /// Current superiority dice.
    pub superiority: Option<u32>,
    /// Current power dice per starship subsystem.
    pub power_dice: BTreeMap<Subsystem, u32>,
    /// Current starship shield points.
    pub shield_points: u32,
    pub shields_depleted: bool,
    /// Vehicle cargo capacity in weight units.
    pub cargo_capacity: f64,
}

/// Armor class calculation mode.
///
/// Persisted as a string; any value other than the built-in modes names a
/// formula from the ruleset's armor-class table (`mage`, `unarmored-monk`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum AcCalc {
    Flat,
    Natural,
    #[default]
    Default,
    Starship,
    Custom,
    Named(String),
}

impl AcCalc {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Flat => "flat",
            Self::Natural => "natural",
            Self::Default => "default",
            Self::Starship => "starship",
            Self::Custom => "custom",
            Self::Named(name) => name,
        }
    }
}

impl From<String> for AcCalc {
    fn from(value: String) -> Self {
        match value.as_str() {
            "flat" => Self::Flat,
            "natural" => Self::Natural,
            "" | "default" => Self::Default,
            "starship" => Self::Starship,
            "custom" => Self::Custom,
            _ => Self::Named(value),
        }
    }
}

impl From<&str> for AcCalc {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<AcCalc> for String {
    fn from(value: AcCalc) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ArmorClassData {
    pub calc: AcCalc,
    pub flat: Option<i32>,
    pub formula: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct HitPointsData {
    pub value: i32,
    pub max: i32,
    pub temp: i32,
    pub temp_max: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct InitiativeData {
    pub bonus: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DeathSaves {
    pub success: u8,
    pub failure: u8,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Details {
    /// Challenge rating (NPCs).
    pub cr: f64,
    /// Starship tier.
    pub tier: u32,
    pub xp: u32,
    /// NPC caster level per track; characters derive theirs from classes.
    pub caster_levels: BTreeMap<CasterTrack, u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Traits {
    pub size: SizeCategory,
}

/// Rule flags stored on the actor. Modifiers may also toggle them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ActorFlags {
    /// Half proficiency on every skill and initiative.
    pub broad_competence: bool,
    /// Half proficiency on skills keyed to the ruleset's adaptive abilities.
    pub adaptive_competence: bool,
    /// Doubles the size multiplier for carrying capacity.
    pub powerful_build: bool,
}

/// An item owned by an actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct OwnedItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    /// Weight of one unit.
    pub weight: f64,
    /// Equipped (gear) or installed (starship equipment).
    pub equipped: bool,
    pub uses: Option<ItemUses>,
    pub system: ItemKind,
}

impl OwnedItem {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, system: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, quantity: u32, weight: f64) -> Self {
        self.quantity = quantity;
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_uses(mut self, uses: ItemUses) -> Self {
        self.uses = Some(uses);
        self
    }

    /// Whether modifiers sourced from this item currently apply.
    pub fn is_active(&self) -> bool {
        match &self.system {
            ItemKind::Equipment(_) | ItemKind::StarshipEquipment(_) => self.equipped,
            _ => true,
        }
    }
}

impl Default for OwnedItem {
    fn default() -> Self {
        Self {
            id: ItemId::default(),
            name: String::new(),
            quantity: 1,
            weight: 0.0,
            equipped: false,
            uses: None,
            system: ItemKind::Gear,
        }
    }
}

/// Type-specific item data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "camelCase")
)]
pub enum ItemKind {
    Class(ClassData),
    Equipment(EquipmentData),
    /// Weapons, consumables, loot and other carried items.
    #[default]
    Gear,
    Feat,
    StarshipSize(StarshipSizeData),
    StarshipEquipment(StarshipEquipmentData),
}

impl ItemKind {
    /// Items that count toward carried weight.
    pub const fn is_physical(&self) -> bool {
        matches!(self, Self::Equipment(_) | Self::Gear)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ClassData {
    pub identifier: String,
    pub levels: u32,
    /// Hit die size (number of faces).
    pub hit_die: u32,
    pub hit_dice_used: u32,
    /// Progression tier per caster track (`full`, `half`, ...).
    pub powercasting: BTreeMap<CasterTrack, String>,
    /// Superiority progression multiplier (0, 0.5 or 1).
    pub superiority: f64,
    pub scale: Vec<ScaleAdvancement>,
}

/// Level-indexed advancement table published as `scale.<class>.<identifier>`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ScaleAdvancement {
    pub identifier: String,
    pub values: BTreeMap<u32, ScaleValue>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum ScaleValue {
    Number(f64),
    Dice { count: u32, faces: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EquipmentData {
    pub armor: Option<ArmorData>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum ArmorSlot {
    #[default]
    Body,
    Shield,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct ArmorData {
    pub slot: ArmorSlot,
    pub value: i32,
    /// Maximum dexterity contribution; `None` means uncapped.
    pub dex_cap: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct StarshipSizeData {
    pub size: SizeCategory,
    pub hull_dice_used: u32,
    pub shld_dice_used: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StarshipEquipmentData {
    pub part: StarshipComponent,
}

impl StarshipEquipmentData {
    pub fn new(part: StarshipComponent) -> Self {
        Self { part }
    }
}

/// Installed starship component.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "camelCase")
)]
pub enum StarshipComponent {
    Armor {
        #[cfg_attr(feature = "serde", serde(default, rename = "acBonus"))]
        ac_bonus: i32,
        #[cfg_attr(feature = "serde", serde(default))]
        dr: i32,
    },
    Shield {
        #[cfg_attr(feature = "serde", serde(default = "unit_multiplier", rename = "capacity"))]
        capacity_multiplier: f64,
        #[cfg_attr(feature = "serde", serde(default = "unit_multiplier", rename = "regen"))]
        regen_multiplier: f64,
    },
    Reactor {
        #[cfg_attr(feature = "serde", serde(default, rename = "fuelCost"))]
        fuel_cost: u32,
        /// Power dice produced by a recharge repair.
        #[cfg_attr(feature = "serde", serde(default, rename = "powerRecovery"))]
        power_recovery: u32,
    },
    PowerCoupling {
        #[cfg_attr(feature = "serde", serde(default, rename = "centralCapacity"))]
        central_capacity: u32,
        #[cfg_attr(feature = "serde", serde(default, rename = "systemCapacity"))]
        system_capacity: u32,
    },
}

#[cfg(feature = "serde")]
fn unit_multiplier() -> f64 {
    1.0
}

/// Limited uses on an item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ItemUses {
    pub value: u32,
    pub max: u32,
    pub per: Option<UsesPeriod>,
    /// Recovery formula for [`UsesPeriod::Charges`].
    pub recovery: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum UsesPeriod {
    Sr,
    Lr,
    Day,
    Charges,
}
