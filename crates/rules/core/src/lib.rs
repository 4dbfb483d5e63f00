//! Deterministic rules engine for tabletop actors.
//!
//! `rules-core` turns a persisted [`ActorRecord`] plus its active modifiers into a
//! fully derived [`DerivedActor`], and owns the resource pools and the pure half of
//! the rest/repair workflows. Nothing here performs I/O: persistence, prompts and
//! scheduling live in `rules-runtime`, which consumes the values produced here.
//!
//! A derivation pass runs in three steps, each returning a new value:
//!
//! ```text
//! prepare_base(record) -> resolve modifiers -> derived stages
//! ```
//!
//! All ruleset data (ability list, skill map, progression tables) arrives through
//! one immutable [`RulesetConfig`].
pub mod config;
pub mod derive;
pub mod dice;
pub mod error;
pub mod formula;
pub mod ids;
pub mod modifiers;
pub mod pools;
pub mod proficiency;
pub mod record;
pub mod rest;
pub mod update;

pub use config::{CasterTrack, PowerLevel, RulesetConfig};
pub use derive::{
    Ability, ArmorClass, Derivation, DerivationWarning, DerivedActor, Encumbrance, Initiative,
    Skill, derive,
};
pub use dice::{DiceRoller, DieResult, RollResult, ScriptedRoller, SeededRoller};
pub use error::{ErrorSeverity, RulesError};
pub use formula::{Formula, FormulaError, RollData};
pub use ids::{AbilityId, ActorId, ItemId, SkillId};
pub use modifiers::{Modifier, ModifierMap, ModifierOperation, ModifierValue};
pub use pools::{DicePool, DieRoll, DieSelection, InsufficientResource, PoolKind, ResourcePool};
pub use proficiency::{Proficiency, ProficiencyMultiplier, Rounding};
pub use record::{ActorKind, ActorRecord, ItemKind, OwnedItem, SizeCategory, Subsystem};
pub use rest::{
    PowerAllocation, RecoveryWarning, RepairKind, RepairResult, RequestedOptions, RestKind,
    RestResult, UsesRecovery, Workflow, WorkflowOptions, WorkflowResult, compute_workflow,
};
pub use update::{ActorUpdate, ItemUpdate};
