//! Rest and repair workflows.
//!
//! This module is the pure `Computing` step of a workflow. Given a derivation,
//! resolved options and a roller, it decides every pool recovery and collects
//! them into one [`WorkflowResult`] holding a single record update and one batch
//! of item updates. The async state machine around it (options, dialogs,
//! persistence) lives in `rules-runtime`.
//!
//! | workflow   | recovers                                                             |
//! |------------|----------------------------------------------------------------------|
//! | short rest | auto hit dice, superiority dice, `sr` uses                           |
//! | long rest  | HP, temp HP, death saves, hit dice (all, or the ruleset ratio), points, superiority, `sr`/`lr` uses |
//! | recharge   | auto hull dice, reactor power dice, `sr` uses                        |
//! | refitting  | hull points, hull dice (all, or the ruleset ratio), shield dice and points, power dice, `sr`/`lr` uses |
//! | regen      | shield dice and points, power dice, `sr` uses                        |
//!
//! `day` uses and charge formulas fire whenever the new-day flag is set.

use std::collections::BTreeMap;

use strum::IntoEnumIterator;

use crate::config::RulesetConfig;
use crate::derive::Derivation;
use crate::dice::{DiceRoller, RollResult};
use crate::formula::FormulaError;
use crate::ids::ItemId;
use crate::pools::{DicePool, DieRoll, DieSelection, PoolKind, ResourcePool, roll_pool_die};
use crate::record::{Subsystem, UsesPeriod};
use crate::update::{ActorUpdate, ItemUpdate, merge_item_updates};

// ============================================================================
// Workflow Kinds
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[strum(serialize_all = "kebab-case")]
pub enum Workflow {
    ShortRest,
    LongRest,
    RechargeRepair,
    RefittingRepair,
    RegenRepair,
}

impl Workflow {
    pub const fn is_repair(self) -> bool {
        matches!(
            self,
            Self::RechargeRepair | Self::RefittingRepair | Self::RegenRepair
        )
    }

    /// Long rests and refitting repairs cross a day boundary unless told otherwise.
    pub const fn default_new_day(self) -> bool {
        matches!(self, Self::LongRest | Self::RefittingRepair)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum RestKind {
    Short,
    Long,
}

impl From<RestKind> for Workflow {
    fn from(kind: RestKind) -> Self {
        match kind {
            RestKind::Short => Self::ShortRest,
            RestKind::Long => Self::LongRest,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum RepairKind {
    Recharge,
    Refitting,
    Regen,
}

impl From<RepairKind> for Workflow {
    fn from(kind: RepairKind) -> Self {
        match kind {
            RepairKind::Recharge => Self::RechargeRepair,
            RepairKind::Refitting => Self::RefittingRepair,
            RepairKind::Regen => Self::RegenRepair,
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options as requested by the caller; unset fields take workflow defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct RequestedOptions {
    pub dialog: Option<bool>,
    pub new_day: Option<bool>,
    pub auto_dice: Option<bool>,
    pub auto_dice_threshold: Option<u32>,
}

/// Fully resolved workflow options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct WorkflowOptions {
    /// Ask the decision provider to confirm or adjust options first.
    pub dialog: bool,
    pub new_day: bool,
    /// Spend hit/hull dice automatically while below the threshold.
    pub auto_dice: bool,
    pub auto_dice_threshold: u32,
}

impl WorkflowOptions {
    pub fn defaults(workflow: Workflow, config: &RulesetConfig) -> Self {
        Self {
            dialog: false,
            new_day: workflow.default_new_day(),
            auto_dice: false,
            auto_dice_threshold: config.rest.auto_dice_threshold,
        }
    }

    #[must_use]
    pub fn merge(self, requested: &RequestedOptions) -> Self {
        Self {
            dialog: requested.dialog.unwrap_or(self.dialog),
            new_day: requested.new_day.unwrap_or(self.new_day),
            auto_dice: requested.auto_dice.unwrap_or(self.auto_dice),
            auto_dice_threshold: requested
                .auto_dice_threshold
                .unwrap_or(self.auto_dice_threshold),
        }
    }
}

/// How recovered power dice are distributed across subsystems.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum PowerAllocation {
    /// Fill subsystems in this order, each up to its capacity.
    Fill(Vec<Subsystem>),
    /// Fixed amounts per subsystem, clamped to capacity and to the dice recovered.
    Explicit(BTreeMap<Subsystem, u32>),
}

impl Default for PowerAllocation {
    /// Central first, then every other subsystem.
    fn default() -> Self {
        Self::Fill(Subsystem::iter().collect())
    }
}

impl PowerAllocation {
    /// Distribute `amount` dice. Returns the dice granted per subsystem.
    pub fn distribute(
        &self,
        amount: u32,
        pools: &BTreeMap<Subsystem, ResourcePool>,
    ) -> BTreeMap<Subsystem, u32> {
        let mut remaining = amount;
        let mut granted = BTreeMap::new();
        let mut give = |subsystem: Subsystem, wanted: u32| {
            let headroom = pools.get(&subsystem).map_or(0, |p| p.headroom());
            let already = granted.get(&subsystem).copied().unwrap_or(0);
            let amount = wanted.min(headroom - already.min(headroom)).min(remaining);
            if amount > 0 {
                remaining -= amount;
                *granted.entry(subsystem).or_insert(0) += amount;
            }
        };
        match self {
            Self::Fill(order) => {
                for subsystem in order {
                    give(*subsystem, u32::MAX);
                }
            }
            Self::Explicit(amounts) => {
                for (subsystem, wanted) in amounts {
                    give(*subsystem, *wanted);
                }
            }
        }
        granted
    }
}

// ============================================================================
// Result
// ============================================================================

/// Recovery of one item's limited uses.
#[derive(Clone, Debug, PartialEq)]
pub struct UsesRecovery {
    pub item: ItemId,
    pub period: UsesPeriod,
    pub before: u32,
    pub after: u32,
    /// Charge-formula roll, if one was made.
    pub roll: Option<RollResult>,
}

/// A recovery formula that could not be evaluated.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("recovery formula '{formula}' on {item} failed: {error}")]
pub struct RecoveryWarning {
    pub item: ItemId,
    pub formula: String,
    pub error: FormulaError,
}

/// Consolidated outcome of one workflow.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowResult {
    pub workflow: Workflow,
    pub new_day: bool,
    /// Net change per pool.
    pub deltas: BTreeMap<PoolKind, i32>,
    pub dice_rolls: Vec<DieRoll>,
    pub item_uses: Vec<UsesRecovery>,
    pub actor_update: ActorUpdate,
    /// One entry per changed item.
    pub item_updates: Vec<ItemUpdate>,
    pub warnings: Vec<RecoveryWarning>,
}

pub type RestResult = WorkflowResult;
pub type RepairResult = WorkflowResult;

impl WorkflowResult {
    pub fn delta(&self, pool: PoolKind) -> i32 {
        self.deltas.get(&pool).copied().unwrap_or(0)
    }
}

// ============================================================================
// Computing
// ============================================================================

struct Computation<'a> {
    derivation: &'a Derivation,
    config: &'a RulesetConfig,
    options: WorkflowOptions,
    roller: &'a dyn DiceRoller,
    deltas: BTreeMap<PoolKind, i32>,
    dice_rolls: Vec<DieRoll>,
    item_uses: Vec<UsesRecovery>,
    update: ActorUpdate,
    item_updates: Vec<ItemUpdate>,
    warnings: Vec<RecoveryWarning>,
}

impl<'a> Computation<'a> {
    /// The derivation, detached from the borrow of `self`.
    fn derivation(&self) -> &'a Derivation {
        self.derivation
    }

    fn note(&mut self, pool: PoolKind, delta: i32) {
        if delta != 0 {
            *self.deltas.entry(pool).or_insert(0) += delta;
        }
    }

    fn bonus(&self) -> i32 {
        self.derivation
            .actor
            .ability_mod(&self.config.hit_die_ability)
    }

    /// Spend dice from `pool` into `target` while `target + threshold <= max`.
    fn auto_spend(&mut self, mut pool: DicePool, target: &mut ResourcePool) -> DicePool {
        if !self.options.auto_dice {
            return pool;
        }
        let bonus = self.bonus();
        while target
            .current()
            .saturating_add(self.options.auto_dice_threshold)
            <= target.max()
            && pool.available() > 0
        {
            match roll_pool_die(&mut pool, &DieSelection::Largest, bonus, target, self.roller) {
                Ok(roll) => {
                    self.note(pool.kind, -1);
                    self.note(target.kind, roll.gained as i32);
                    self.dice_rolls.push(roll);
                }
                Err(_) => break,
            }
        }
        pool
    }

    fn recover_dice_by_ratio(&mut self, mut pool: DicePool, ratio: f64) -> DicePool {
        let amount = ((f64::from(pool.max()) * ratio).floor() as u32).max(1);
        let recovered = pool.recover(amount);
        self.note(pool.kind, recovered as i32);
        pool
    }

    fn recover_dice_fully(&mut self, mut pool: DicePool) -> DicePool {
        let recovered = pool.recover_all();
        self.note(pool.kind, recovered as i32);
        pool
    }

    fn finish_dice(&mut self, pool: &DicePool) {
        self.item_updates.extend(pool.item_updates());
    }

    fn hit_points(&self) -> ResourcePool {
        self.derivation.actor.hp.pool
    }

    fn set_hit_points(&mut self, before: ResourcePool, after: ResourcePool) {
        if after.current() != before.current() {
            self.note(after.kind, after.current() as i32 - before.current() as i32);
            self.update.hp = Some(after.current() as i32);
        }
    }

    fn long_rest_hit_points(&mut self) {
        let before = self.hit_points();
        let mut after = before;
        after.recover_all();
        self.set_hit_points(before, after);

        let hp = &self.derivation().record.attributes.hp;
        if hp.temp != 0 {
            self.update.temp_hp = Some(0);
        }
        if hp.temp_max != 0 {
            self.update.temp_max_hp = Some(0);
        }
        let death = &self.derivation().record.attributes.death;
        if death.success != 0 || death.failure != 0 {
            self.update.reset_death_saves = true;
        }
    }

    fn restore_points(&mut self) {
        for (track, casting) in &self.derivation().actor.powercasting {
            let pool = casting.points;
            if !pool.is_full() {
                self.note(PoolKind::Points(*track), pool.headroom() as i32);
                self.update.points.insert(*track, pool.max());
            }
        }
    }

    fn restore_superiority(&mut self) {
        if let Some(superiority) = &self.derivation().actor.superiority {
            let pool = superiority.dice;
            if !pool.is_full() {
                self.note(PoolKind::SuperiorityDice, pool.headroom() as i32);
                self.update.superiority_dice = Some(pool.max());
            }
        }
    }

    fn restore_power_dice(&mut self) {
        let Some(ship) = &self.derivation().actor.starship else {
            return;
        };
        for (subsystem, pool) in &ship.power_dice {
            if !pool.is_full() {
                self.note(PoolKind::PowerDice(*subsystem), pool.headroom() as i32);
                self.update.power_dice.insert(*subsystem, pool.max());
            }
        }
    }

    fn recharge_power_dice(&mut self, allocation: &PowerAllocation) {
        let Some(ship) = &self.derivation().actor.starship else {
            return;
        };
        let granted = allocation.distribute(ship.power_recovery, &ship.power_dice);
        for (subsystem, amount) in granted {
            let current = ship.power_dice.get(&subsystem).map_or(0, |p| p.current());
            self.note(PoolKind::PowerDice(subsystem), amount as i32);
            self.update.power_dice.insert(subsystem, current + amount);
        }
    }

    fn restore_shields(&mut self) {
        let Some(ship) = &self.derivation().actor.starship else {
            return;
        };
        let pool = ship.shield_points;
        if !pool.is_full() {
            self.note(PoolKind::ShieldPoints, pool.headroom() as i32);
            self.update.shield_points = Some(pool.max());
        }
        if ship.shields_depleted {
            self.update.shields_depleted = Some(false);
        }
    }

    fn recover_uses(&mut self, periods: &[UsesPeriod]) {
        let record = &self.derivation().record;
        for item in &record.items {
            let Some(uses) = &item.uses else { continue };
            let Some(period) = uses.per else { continue };

            let new_day = self.options.new_day;
            let fires = periods.contains(&period)
                || (new_day && matches!(period, UsesPeriod::Day | UsesPeriod::Charges));
            if !fires {
                continue;
            }

            let (after, roll) = if period == UsesPeriod::Charges {
                let Some(formula) = uses.recovery.as_deref().filter(|f| !f.trim().is_empty())
                else {
                    continue;
                };
                match crate::dice::roll(formula, &self.derivation().actor.roll_data, self.roller) {
                    Ok(roll) => {
                        let value = (i64::from(uses.value) + i64::from(roll.total))
                            .clamp(0, i64::from(uses.max)) as u32;
                        (value, Some(roll))
                    }
                    Err(error) => {
                        self.warnings.push(RecoveryWarning {
                            item: item.id.clone(),
                            formula: formula.to_owned(),
                            error,
                        });
                        continue;
                    }
                }
            } else {
                (uses.max, None)
            };

            if after == uses.value && roll.is_none() {
                continue;
            }
            self.item_uses.push(UsesRecovery {
                item: item.id.clone(),
                period,
                before: uses.value,
                after,
                roll,
            });
            if after != uses.value {
                self.item_updates.push(ItemUpdate {
                    uses: Some(after),
                    ..ItemUpdate::new(item.id.clone())
                });
            }
        }
    }
}

/// Compute a workflow against a derivation.
///
/// The derivation's record must be the prepared record (as returned by
/// [`crate::derive`]); its base patch is not included here, the caller merges
/// it into the final update.
pub fn compute_workflow(
    derivation: &Derivation,
    workflow: Workflow,
    options: WorkflowOptions,
    allocation: &PowerAllocation,
    config: &RulesetConfig,
    roller: &dyn DiceRoller,
) -> WorkflowResult {
    let mut c = Computation {
        derivation,
        config,
        options,
        roller,
        deltas: BTreeMap::new(),
        dice_rolls: Vec::new(),
        item_uses: Vec::new(),
        update: ActorUpdate::default(),
        item_updates: Vec::new(),
        warnings: Vec::new(),
    };
    let record = &derivation.record;

    match workflow {
        Workflow::ShortRest => {
            let before = c.hit_points();
            let mut hp = before;
            let pool = c.auto_spend(DicePool::hit_dice(record), &mut hp);
            c.finish_dice(&pool);
            // auto_spend already recorded the hp delta per die
            if hp.current() != before.current() {
                c.update.hp = Some(hp.current() as i32);
            }
            c.restore_superiority();
            c.recover_uses(&[UsesPeriod::Sr]);
        }
        Workflow::LongRest => {
            c.long_rest_hit_points();
            let pool = c.recover_dice_by_ratio(DicePool::hit_dice(record), config.rest.hit_dice_ratio);
            c.finish_dice(&pool);
            c.restore_points();
            c.restore_superiority();
            c.recover_uses(&[UsesPeriod::Sr, UsesPeriod::Lr]);
        }
        Workflow::RechargeRepair => {
            let before = c.hit_points();
            let mut hull = before;
            let pool = c.auto_spend(DicePool::hull_dice(record, config), &mut hull);
            c.finish_dice(&pool);
            if hull.current() != before.current() {
                c.update.hp = Some(hull.current() as i32);
            }
            c.recharge_power_dice(allocation);
            c.recover_uses(&[UsesPeriod::Sr]);
        }
        Workflow::RefittingRepair => {
            let before = c.hit_points();
            let mut after = before;
            after.recover_all();
            c.set_hit_points(before, after);
            let hull =
                c.recover_dice_by_ratio(DicePool::hull_dice(record, config), config.rest.hull_dice_ratio);
            c.finish_dice(&hull);
            let shields = c.recover_dice_fully(DicePool::shield_dice(record, config));
            c.finish_dice(&shields);
            c.restore_shields();
            c.restore_power_dice();
            c.recover_uses(&[UsesPeriod::Sr, UsesPeriod::Lr]);
        }
        Workflow::RegenRepair => {
            let shields = c.recover_dice_fully(DicePool::shield_dice(record, config));
            c.finish_dice(&shields);
            c.restore_shields();
            c.restore_power_dice();
            c.recover_uses(&[UsesPeriod::Sr]);
        }
    }

    WorkflowResult {
        workflow,
        new_day: options.new_day,
        deltas: c.deltas,
        dice_rolls: c.dice_rolls,
        item_uses: c.item_uses,
        actor_update: c.update,
        item_updates: merge_item_updates(c.item_updates),
        warnings: c.warnings,
    }
}
