//! Resource pools.
//!
//! Every spendable resource is either a [`ResourcePool`] (points, power dice,
//! hit points) or a [`DicePool`] (hit, hull and shield dice backed by per-item
//! usage counters).
//!
//! - Maximum values: recomputed every derivation pass
//! - Current values: persisted, changed only by `spend`/`recover`
//!
//! Both kinds keep `0 <= current <= max` at all times. Dice pools hold one bucket
//! per source item so mixed die sizes (a d10 class and a d6 class) are spent and
//! recovered from the right counter.

use std::fmt;
use std::str::FromStr;

use crate::config::{CasterTrack, RulesetConfig};
use crate::dice::{DiceRoller, RollResult};
use crate::error::{ErrorSeverity, RulesError};
use crate::ids::ItemId;
use crate::record::{ActorRecord, Subsystem};
use crate::update::ItemUpdate;

// ============================================================================
// Pool Kind
// ============================================================================

/// Identifies a pool in results, deltas and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "String", try_from = "String")
)]
pub enum PoolKind {
    HitDice,
    HullDice,
    ShieldDice,
    PowerDice(Subsystem),
    Points(CasterTrack),
    SuperiorityDice,
    HitPoints,
    HullPoints,
    ShieldPoints,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HitDice => f.write_str("hitDice"),
            Self::HullDice => f.write_str("hullDice"),
            Self::ShieldDice => f.write_str("shieldDice"),
            Self::PowerDice(subsystem) => write!(f, "powerDice.{subsystem}"),
            Self::Points(track) => write!(f, "points.{track}"),
            Self::SuperiorityDice => f.write_str("superiorityDice"),
            Self::HitPoints => f.write_str("hp"),
            Self::HullPoints => f.write_str("hullPoints"),
            Self::ShieldPoints => f.write_str("shieldPoints"),
        }
    }
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;

        let kind = match s {
            "hitDice" => Self::HitDice,
            "hullDice" => Self::HullDice,
            "shieldDice" => Self::ShieldDice,
            "superiorityDice" => Self::SuperiorityDice,
            "hp" => Self::HitPoints,
            "hullPoints" => Self::HullPoints,
            "shieldPoints" => Self::ShieldPoints,
            other => {
                let (prefix, name) = other
                    .split_once('.')
                    .ok_or_else(|| format!("unknown pool '{other}'"))?;
                match prefix {
                    "powerDice" => Subsystem::iter()
                        .find(|s| s.to_string() == name)
                        .map(Self::PowerDice),
                    "points" => CasterTrack::iter()
                        .find(|t| t.to_string() == name)
                        .map(Self::Points),
                    _ => None,
                }
                .ok_or_else(|| format!("unknown pool '{other}'"))?
            }
        };
        Ok(kind)
    }
}

impl From<PoolKind> for String {
    fn from(value: PoolKind) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PoolKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Spending more than a pool currently holds.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("insufficient {pool}: requested {requested}, available {available}")]
pub struct InsufficientResource {
    pub pool: PoolKind,
    pub requested: u32,
    pub available: u32,
}

impl RulesError for InsufficientResource {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        "INSUFFICIENT_RESOURCE"
    }
}

// ============================================================================
// Resource Pool
// ============================================================================

/// A current/max counter with an optional die denomination.
///
/// Deserialization goes through [`ResourcePool::new`], so stored data can
/// never produce `current > max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "RawPool")
)]
pub struct ResourcePool {
    pub kind: PoolKind,
    pub denomination: Option<u32>,
    current: u32,
    max: u32,
}

/// Unchecked wire shape of a [`ResourcePool`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPool {
    kind: PoolKind,
    #[serde(default)]
    denomination: Option<u32>,
    current: u32,
    max: u32,
}

#[cfg(feature = "serde")]
impl From<RawPool> for ResourcePool {
    fn from(raw: RawPool) -> Self {
        let pool = Self::new(raw.kind, raw.current, raw.max);
        match raw.denomination {
            Some(faces) => pool.with_denomination(faces),
            None => pool,
        }
    }
}

impl ResourcePool {
    /// Create a pool, clamping `current` into `[0, max]`.
    pub fn new(kind: PoolKind, current: u32, max: u32) -> Self {
        Self {
            kind,
            denomination: None,
            current: current.min(max),
            max,
        }
    }

    pub fn full(kind: PoolKind, max: u32) -> Self {
        Self::new(kind, max, max)
    }

    /// Pool over a signed stored value; negative values clamp to zero.
    pub fn from_signed(kind: PoolKind, current: i32, max: i32) -> Self {
        let max = max.max(0) as u32;
        Self::new(kind, current.max(0) as u32, max)
    }

    #[must_use]
    pub fn with_denomination(mut self, faces: u32) -> Self {
        self.denomination = Some(faces);
        self
    }

    pub const fn current(&self) -> u32 {
        self.current
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    pub const fn headroom(&self) -> u32 {
        self.max - self.current
    }

    pub const fn spent(&self) -> u32 {
        self.max - self.current
    }

    pub const fn is_empty(&self) -> bool {
        self.current == 0
    }

    pub const fn is_full(&self) -> bool {
        self.current == self.max
    }

    /// Spend `amount`, failing without change if the pool holds less.
    pub fn spend(&mut self, amount: u32) -> Result<u32, InsufficientResource> {
        if amount > self.current {
            return Err(InsufficientResource {
                pool: self.kind,
                requested: amount,
                available: self.current,
            });
        }
        self.current -= amount;
        Ok(self.current)
    }

    /// Recover up to `amount`, clamped to max. Returns the new current value.
    pub fn recover(&mut self, amount: u32) -> u32 {
        self.current = self.current.saturating_add(amount).min(self.max);
        self.current
    }

    pub fn recover_all(&mut self) -> u32 {
        self.current = self.max;
        self.current
    }

    /// Change the maximum, clamping current down if needed.
    pub fn set_max(&mut self, max: u32) {
        self.max = max;
        self.current = self.current.min(max);
    }
}

// ============================================================================
// Dice Pool
// ============================================================================

/// How to choose which die to spend when several buckets hold dice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum DieSelection {
    #[default]
    FirstAvailable,
    Largest,
    Denomination(u32),
    Source(ItemId),
}

/// Dice granted by one source item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiceBucket {
    pub source: ItemId,
    pub denomination: u32,
    pub max: u32,
    pub used: u32,
    /// `used` as loaded; lets the pool report only changed counters.
    initial_used: u32,
}

impl DiceBucket {
    pub fn new(source: ItemId, denomination: u32, max: u32, used: u32) -> Self {
        let used = used.min(max);
        Self {
            source,
            denomination,
            max,
            used,
            initial_used: used,
        }
    }

    pub const fn available(&self) -> u32 {
        self.max - self.used
    }
}

/// The die taken by [`DicePool::spend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpentDie {
    pub source: ItemId,
    pub denomination: u32,
}

/// Dice pool over per-item usage counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DicePool {
    pub kind: PoolKind,
    buckets: Vec<DiceBucket>,
}

impl DicePool {
    pub fn new(kind: PoolKind, buckets: Vec<DiceBucket>) -> Self {
        Self { kind, buckets }
    }

    /// Hit dice: one bucket per class item, one die per class level.
    pub fn hit_dice(record: &ActorRecord) -> Self {
        let buckets = record
            .classes()
            .filter(|(_, class)| class.levels > 0 && class.hit_die > 0)
            .map(|(item, class)| {
                DiceBucket::new(
                    item.id.clone(),
                    class.hit_die,
                    class.levels,
                    class.hit_dice_used,
                )
            })
            .collect();
        Self::new(PoolKind::HitDice, buckets)
    }

    /// Hull dice from the authoritative starship size item.
    pub fn hull_dice(record: &ActorRecord, config: &RulesetConfig) -> Self {
        let buckets = record
            .starship_size()
            .map(|(item, size)| {
                let spec = config.starship.size(size.size);
                DiceBucket::new(
                    item.id.clone(),
                    spec.hull_die,
                    spec.hull_dice(record.details.tier),
                    size.hull_dice_used,
                )
            })
            .into_iter()
            .collect();
        Self::new(PoolKind::HullDice, buckets)
    }

    /// Shield dice from the authoritative starship size item.
    pub fn shield_dice(record: &ActorRecord, config: &RulesetConfig) -> Self {
        let buckets = record
            .starship_size()
            .map(|(item, size)| {
                let spec = config.starship.size(size.size);
                DiceBucket::new(
                    item.id.clone(),
                    spec.shield_die,
                    spec.shield_dice(record.details.tier),
                    size.shld_dice_used,
                )
            })
            .into_iter()
            .collect();
        Self::new(PoolKind::ShieldDice, buckets)
    }

    pub fn buckets(&self) -> &[DiceBucket] {
        &self.buckets
    }

    pub fn max(&self) -> u32 {
        self.buckets.iter().map(|b| b.max).sum()
    }

    pub fn available(&self) -> u32 {
        self.buckets.iter().map(DiceBucket::available).sum()
    }

    pub fn used(&self) -> u32 {
        self.buckets.iter().map(|b| b.used).sum()
    }

    /// Largest die size with at least one die available.
    pub fn largest_available(&self) -> Option<u32> {
        self.buckets
            .iter()
            .filter(|b| b.available() > 0)
            .map(|b| b.denomination)
            .max()
    }

    /// Aggregate view as a plain resource pool.
    pub fn summary(&self) -> ResourcePool {
        let pool = ResourcePool::new(self.kind, self.available(), self.max());
        match self.buckets.iter().map(|b| b.denomination).max() {
            Some(faces) => pool.with_denomination(faces),
            None => pool,
        }
    }

    /// Spend one die chosen by `selection`.
    pub fn spend(&mut self, selection: &DieSelection) -> Result<SpentDie, InsufficientResource> {
        let index = match selection {
            DieSelection::FirstAvailable => self.buckets.iter().position(|b| b.available() > 0),
            DieSelection::Largest => self
                .buckets
                .iter()
                .enumerate()
                .filter(|(_, b)| b.available() > 0)
                // max_by_key returns the last maximum; reverse to keep the first.
                .rev()
                .max_by_key(|(_, b)| b.denomination)
                .map(|(index, _)| index),
            DieSelection::Denomination(faces) => self
                .buckets
                .iter()
                .position(|b| b.available() > 0 && b.denomination == *faces),
            DieSelection::Source(source) => self
                .buckets
                .iter()
                .position(|b| b.available() > 0 && &b.source == source),
        };

        let Some(bucket) = index.map(|i| &mut self.buckets[i]) else {
            return Err(InsufficientResource {
                pool: self.kind,
                requested: 1,
                available: 0,
            });
        };
        bucket.used += 1;
        Ok(SpentDie {
            source: bucket.source.clone(),
            denomination: bucket.denomination,
        })
    }

    /// Recover up to `count` dice, largest denomination first.
    ///
    /// Returns the number actually recovered.
    pub fn recover(&mut self, count: u32) -> u32 {
        let mut order: Vec<usize> = (0..self.buckets.len()).collect();
        order.sort_by(|a, b| {
            self.buckets[*b]
                .denomination
                .cmp(&self.buckets[*a].denomination)
        });

        let mut remaining = count;
        for index in order {
            if remaining == 0 {
                break;
            }
            let bucket = &mut self.buckets[index];
            let restored = bucket.used.min(remaining);
            bucket.used -= restored;
            remaining -= restored;
        }
        count - remaining
    }

    pub fn recover_all(&mut self) -> u32 {
        let used = self.used();
        for bucket in &mut self.buckets {
            bucket.used = 0;
        }
        used
    }

    /// Item patches for every bucket whose counter changed since load.
    pub fn item_updates(&self) -> Vec<ItemUpdate> {
        self.buckets
            .iter()
            .filter(|b| b.used != b.initial_used)
            .map(|b| {
                let mut update = ItemUpdate::new(b.source.clone());
                match self.kind {
                    PoolKind::HullDice => update.hull_dice_used = Some(b.used),
                    PoolKind::ShieldDice => update.shld_dice_used = Some(b.used),
                    _ => update.hit_dice_used = Some(b.used),
                }
                update
            })
            .collect()
    }
}

// ============================================================================
// Rolling
// ============================================================================

/// One die spent from a pool and rolled into a target pool.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DieRoll {
    pub pool: PoolKind,
    pub source: ItemId,
    pub denomination: u32,
    /// The full roll, even when only part of it could be applied.
    pub roll: RollResult,
    /// Amount actually added to the target.
    pub gained: u32,
}

/// Spend one die from `pool`, roll it plus `bonus`, and add the result to
/// `target` up to its headroom.
///
/// The die is spent even when the target is already full; the excess over the
/// headroom is discarded but stays visible in [`DieRoll::roll`]. Negative totals
/// grant nothing.
pub fn roll_pool_die(
    pool: &mut DicePool,
    selection: &DieSelection,
    bonus: i32,
    target: &mut ResourcePool,
    roller: &dyn DiceRoller,
) -> Result<DieRoll, InsufficientResource> {
    let spent = pool.spend(selection)?;
    let value = roller
        .roll_die(spent.denomination)
        .clamp(1, spent.denomination.max(1));
    let roll = RollResult::single(spent.denomination, value, bonus);

    let gained = (roll.total.max(0) as u32).min(target.headroom());
    target.recover(gained);

    Ok(DieRoll {
        pool: pool.kind,
        source: spent.source,
        denomination: spent.denomination,
        roll,
        gained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedRoller;

    fn mixed_pool() -> DicePool {
        DicePool::new(
            PoolKind::HitDice,
            vec![
                DiceBucket::new(ItemId::from("scout"), 8, 2, 0),
                DiceBucket::new(ItemId::from("fighter"), 10, 3, 1),
            ],
        )
    }

    #[test]
    fn spend_then_recover_conserves() {
        let mut pool = ResourcePool::new(PoolKind::Points(CasterTrack::Force), 7, 10);
        assert_eq!(pool.spend(3), Ok(4));
        assert_eq!(pool.recover(3), 7);
        assert_eq!(pool.recover(50), 10);
    }

    #[test]
    fn overspend_is_typed_failure() {
        let mut pool = ResourcePool::new(PoolKind::SuperiorityDice, 1, 4);
        let err = pool.spend(2).unwrap_err();
        assert_eq!(err.available, 1);
        assert_eq!(err.requested, 2);
        assert_eq!(pool.current(), 1);
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
    }

    #[test]
    fn construction_clamps_current() {
        let pool = ResourcePool::new(PoolKind::HitPoints, 30, 20);
        assert_eq!(pool.current(), 20);
        let pool = ResourcePool::from_signed(PoolKind::HitPoints, -4, 20);
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn selection_policies() {
        let mut pool = mixed_pool();
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.spend(&DieSelection::Largest).unwrap().denomination, 10);
        assert_eq!(
            pool.spend(&DieSelection::FirstAvailable).unwrap().source,
            ItemId::from("scout")
        );
        assert!(pool.spend(&DieSelection::Denomination(12)).is_err());
        assert_eq!(
            pool.spend(&DieSelection::Source(ItemId::from("fighter")))
                .unwrap()
                .denomination,
            10
        );
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn recover_prefers_large_dice() {
        let mut pool = mixed_pool();
        pool.spend(&DieSelection::FirstAvailable).unwrap();
        pool.spend(&DieSelection::FirstAvailable).unwrap();
        // scout 2 used, fighter 1 used
        assert_eq!(pool.recover(2), 2);
        assert_eq!(pool.buckets()[1].used, 0);
        assert_eq!(pool.buckets()[0].used, 1);

        let updates = pool.item_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].hit_dice_used, Some(1));
        assert_eq!(updates[1].hit_dice_used, Some(0));
    }

    #[test]
    fn rolled_die_is_capped_at_headroom() {
        let mut pool = DicePool::new(
            PoolKind::HitDice,
            vec![DiceBucket::new(ItemId::from("class"), 8, 1, 0)],
        );
        let mut hp = ResourcePool::new(PoolKind::HitPoints, 1, 4);
        let roller = ScriptedRoller::new([6]);

        let roll =
            roll_pool_die(&mut pool, &DieSelection::default(), 0, &mut hp, &roller).unwrap();
        assert_eq!(hp.current(), 4);
        assert_eq!(roll.gained, 3);
        assert_eq!(roll.roll.total, 6);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn full_target_still_spends_the_die() {
        let mut pool = mixed_pool();
        let mut hp = ResourcePool::full(PoolKind::HitPoints, 12);
        let roller = ScriptedRoller::new([5]);
        let roll =
            roll_pool_die(&mut pool, &DieSelection::Largest, -1, &mut hp, &roller).unwrap();
        assert_eq!(roll.gained, 0);
        assert_eq!(roll.roll.total, 4);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn pool_kind_round_trips_through_text() {
        for kind in [
            PoolKind::HitDice,
            PoolKind::PowerDice(Subsystem::Engines),
            PoolKind::Points(CasterTrack::Tech),
        ] {
            assert_eq!(kind.to_string().parse::<PoolKind>(), Ok(kind));
        }
        assert!("points.psionic".parse::<PoolKind>().is_err());
    }
}
