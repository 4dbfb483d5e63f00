//! Dice rolling.
//!
//! All randomness enters the engine through [`DiceRoller`]. Pool math only ever
//! consumes the [`RollResult::total`]; the individual dice are kept for audit.
//!
//! # Determinism
//!
//! [`SeededRoller`] is a PCG-XSH-RR generator: the same seed always yields the
//! same sequence of rolls, which makes workflows replayable. [`ScriptedRoller`]
//! returns a fixed sequence and exists for tests and for replaying recorded rolls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::formula::{Formula, FormulaError, RollData};

/// Source of die results.
pub trait DiceRoller: Send + Sync {
    /// Roll one die with `faces` sides (1..=faces).
    fn roll_die(&self, faces: u32) -> u32;
}

/// One rolled die.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DieResult {
    pub faces: u32,
    pub value: u32,
}

/// Outcome of rolling a formula.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollResult {
    pub formula: String,
    pub total: i32,
    pub dice: Vec<DieResult>,
}

impl RollResult {
    /// Result for a single die plus a flat bonus.
    pub fn single(faces: u32, value: u32, bonus: i32) -> Self {
        let formula = match bonus {
            0 => format!("1d{faces}"),
            b if b > 0 => format!("1d{faces} + {b}"),
            b => format!("1d{faces} - {}", b.unsigned_abs()),
        };
        Self {
            formula,
            total: i32::try_from(value).unwrap_or(i32::MAX).saturating_add(bonus),
            dice: vec![DieResult { faces, value }],
        }
    }
}

/// Parse and roll a formula, truncating the total toward negative infinity.
pub fn roll(
    formula: &str,
    data: &RollData,
    roller: &dyn DiceRoller,
) -> Result<RollResult, FormulaError> {
    let evaluation = Formula::parse(formula)?.evaluate(data, Some(roller))?;
    Ok(RollResult {
        formula: formula.to_owned(),
        total: evaluation.total.floor() as i32,
        dice: evaluation.dice,
    })
}

// ============================================================================
// Seeded PCG roller
// ============================================================================

/// Deterministic PCG-XSH-RR roller.
///
/// Each roll mixes the seed with an internal counter, so one roller produces a
/// reproducible stream while remaining shareable behind `&self`.
#[derive(Debug)]
pub struct SeededRoller {
    seed: u64,
    nonce: AtomicU64,
}

impl SeededRoller {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            nonce: AtomicU64::new(0),
        }
    }

    /// Number of dice rolled so far.
    pub fn rolls(&self) -> u64 {
        self.nonce.load(Ordering::Relaxed)
    }

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    fn next_u32(&self) -> u32 {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let mixed = self
            .seed
            .wrapping_add(nonce.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self::output(Self::step(Self::step(mixed)))
    }
}

impl Default for SeededRoller {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DiceRoller for SeededRoller {
    fn roll_die(&self, faces: u32) -> u32 {
        if faces == 0 {
            return 0;
        }
        (self.next_u32() % faces) + 1
    }
}

// ============================================================================
// Scripted roller
// ============================================================================

/// Roller that replays a fixed sequence.
///
/// Values are clamped to the die's range; once the script is exhausted every
/// further die rolls a 1.
#[derive(Debug, Default)]
pub struct ScriptedRoller {
    script: Mutex<VecDeque<u32>>,
}

impl ScriptedRoller {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: Mutex::new(values.into_iter().collect()),
        }
    }

    /// Values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map_or(0, |script| script.len())
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll_die(&self, faces: u32) -> u32 {
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or(1).clamp(1, faces.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_roller_is_reproducible() {
        let a = SeededRoller::new(42);
        let b = SeededRoller::new(42);
        let first: Vec<u32> = (0..16).map(|_| a.roll_die(20)).collect();
        let second: Vec<u32> = (0..16).map(|_| b.roll_die(20)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|v| (1..=20).contains(v)));
        assert_eq!(a.rolls(), 16);
    }

    #[test]
    fn scripted_roller_clamps_and_defaults() {
        let roller = ScriptedRoller::new([9, 0]);
        assert_eq!(roller.roll_die(6), 6);
        assert_eq!(roller.roll_die(6), 1);
        assert_eq!(roller.roll_die(6), 1);
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    fn roll_keeps_dice_detail() {
        let roller = ScriptedRoller::new([3, 4]);
        let result = roll("2d6 + 1", &RollData::new(), &roller).unwrap();
        assert_eq!(result.total, 8);
        assert_eq!(result.dice.len(), 2);
        assert_eq!(result.formula, "2d6 + 1");
    }

    #[test]
    fn single_die_formula_text() {
        assert_eq!(RollResult::single(8, 5, 2).formula, "1d8 + 2");
        assert_eq!(RollResult::single(8, 1, -1).total, 0);
        assert_eq!(RollResult::single(8, 1, -1).formula, "1d8 - 1");
    }
}
