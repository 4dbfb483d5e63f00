//! Proficiency terms.
//!
//! Saves, skills, initiative and every other proficiency-gated stat share one
//! algorithm: `flat = round(base × multiplier)` with a configurable rounding
//! direction (down unless stated otherwise).

/// Proficiency multiplier, stored as half steps in `[0, 2]`.
///
/// Stored data may hold any number; construction snaps it to the nearest
/// half step and clamps, so `0.7` becomes `0.5` and `3` becomes `2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "f64", into = "f64")
)]
pub struct ProficiencyMultiplier(u8);

impl ProficiencyMultiplier {
    pub const NONE: Self = Self(0);
    pub const HALF: Self = Self(1);
    pub const FULL: Self = Self(2);
    pub const EXPERTISE: Self = Self(4);

    const MAX_HALVES: f64 = 4.0;

    /// Snap a raw multiplier to the nearest half step in `[0, 2]`.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::NONE;
        }
        let halves = (value * 2.0).round().clamp(0.0, Self::MAX_HALVES);
        Self(halves as u8)
    }

    /// Number of half steps (0..=4).
    pub const fn halves(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    /// Raise to at least half proficiency. Never lowers an existing value.
    pub fn at_least_half(self) -> Self {
        self.max(Self::HALF)
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<f64> for ProficiencyMultiplier {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<ProficiencyMultiplier> for f64 {
    fn from(value: ProficiencyMultiplier) -> Self {
        value.as_f64()
    }
}

/// Rounding applied when a multiplier produces a fractional bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Rounding {
    #[default]
    Down,
    Up,
}

/// A `(base, multiplier)` pair yielding a flat bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proficiency {
    pub base: i32,
    pub multiplier: ProficiencyMultiplier,
    pub rounding: Rounding,
}

impl Proficiency {
    pub const fn new(base: i32, multiplier: ProficiencyMultiplier) -> Self {
        Self {
            base,
            multiplier,
            rounding: Rounding::Down,
        }
    }

    #[must_use]
    pub const fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Flat bonus contributed by this term.
    pub fn flat(&self) -> i32 {
        let doubled = self.base.saturating_mul(i32::from(self.multiplier.halves()));
        match self.rounding {
            Rounding::Down => doubled.div_euclid(2),
            Rounding::Up => doubled.saturating_add(1).div_euclid(2),
        }
    }
}
