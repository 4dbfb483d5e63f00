//! Formula language for armor-class expressions, charge recovery and die rolls.
//!
//! A formula is plain arithmetic over numbers, dice terms and roll-data
//! references:
//!
//! ```text
//! 10 + @abilities.dex.mod + @abilities.wis.mod
//! 1d6 + @prof
//! max(1, floor(@details.level / 2))
//! ```
//!
//! Supported syntax:
//! - integer and decimal literals
//! - `+ - * /` with the usual precedence, unary minus, parentheses
//! - `NdM` dice terms (`d8` alone means `1d8`)
//! - `@path` references resolved against [`RollData`]
//! - `min(..)`, `max(..)`, `floor(x)`, `ceil(x)`
//!
//! Parsing and evaluation are separate so a stored formula can be validated once
//! and evaluated many times. Dice terms require a [`DiceRoller`]; evaluating a
//! formula that contains dice without one is an error, which is how the armor
//! class stage rejects random formulas.
//!
//! [`DiceRoller`]: crate::dice::DiceRoller

pub mod evaluate;
pub mod parse;

use std::collections::BTreeMap;
use std::str::FromStr;

pub use evaluate::{Evaluation, evaluate};

use crate::error::{ErrorSeverity, RulesError};

// ============================================================================
// Formula Definition
// ============================================================================

/// Parsed formula expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Formula {
    Constant(f64),

    /// `@path` reference into roll data, stored without the leading `@`.
    Reference(String),

    /// `NdM` dice term.
    Dice { count: u32, faces: u32 },

    Negate(Box<Formula>),
    Sum(Box<Formula>, Box<Formula>),
    Difference(Box<Formula>, Box<Formula>),
    Product(Box<Formula>, Box<Formula>),
    Quotient(Box<Formula>, Box<Formula>),

    Min(Vec<Formula>),
    Max(Vec<Formula>),
    Floor(Box<Formula>),
    Ceil(Box<Formula>),
}

impl Formula {
    /// Parse a formula string.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        parse::parse(source)
    }

    /// Whether evaluating this formula rolls dice, directly or via a
    /// reference that may resolve to dice.
    pub fn has_dice(&self) -> bool {
        match self {
            Self::Dice { .. } => true,
            Self::Constant(_) | Self::Reference(_) => false,
            Self::Negate(inner) | Self::Floor(inner) | Self::Ceil(inner) => inner.has_dice(),
            Self::Sum(a, b) | Self::Difference(a, b) | Self::Product(a, b) | Self::Quotient(a, b) => {
                a.has_dice() || b.has_dice()
            }
            Self::Min(args) | Self::Max(args) => args.iter().any(Self::has_dice),
        }
    }

    /// Every reference path the formula reads.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Reference(path) => out.push(path),
            Self::Constant(_) | Self::Dice { .. } => {}
            Self::Negate(inner) | Self::Floor(inner) | Self::Ceil(inner) => {
                inner.collect_references(out)
            }
            Self::Sum(a, b) | Self::Difference(a, b) | Self::Product(a, b) | Self::Quotient(a, b) => {
                a.collect_references(out);
                b.collect_references(out);
            }
            Self::Min(args) | Self::Max(args) => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
        }
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Roll Data
// ============================================================================

/// Value published under a roll-data path.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum RollValue {
    Number(f64),
    /// Dice published by a scale value; rolled when referenced.
    Dice { count: u32, faces: u32 },
}

/// Flat map of `@`-reference paths to values.
///
/// Built once per derivation pass from the derived actor (`abilities.dex.mod`,
/// `prof`, `details.level`, `scale.<class>.<id>`, ...).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollData {
    pub values: BTreeMap<String, RollValue>,
}

impl RollData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_number(&mut self, path: impl Into<String>, value: f64) {
        self.values.insert(path.into(), RollValue::Number(value));
    }

    pub fn insert_dice(&mut self, path: impl Into<String>, count: u32, faces: u32) {
        self.values
            .insert(path.into(), RollValue::Dice { count, faces });
    }

    #[must_use]
    pub fn with_number(mut self, path: impl Into<String>, value: f64) -> Self {
        self.insert_number(path, value);
        self
    }

    pub fn get(&self, path: &str) -> Option<RollValue> {
        self.values.get(path).copied()
    }

    /// Numeric value at `path`, if present and not a dice term.
    pub fn number(&self, path: &str) -> Option<f64> {
        match self.values.get(path) {
            Some(RollValue::Number(value)) => Some(*value),
            _ => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Formula parse and evaluation failures.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' does not take {found} argument(s)")]
    WrongArity { function: String, found: usize },

    #[error("unresolved reference '@{0}'")]
    UnresolvedReference(String),

    #[error("invalid dice term {count}d{faces}")]
    InvalidDice { count: u32, faces: u32 },

    #[error("dice are not allowed in this formula")]
    DiceNotAllowed,

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula produced a non-finite value")]
    NonFinite,

    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("formula has more than {limit} tokens")]
    TooLong { limit: usize },
}

impl RulesError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnresolvedReference(_) | Self::DivisionByZero | Self::NonFinite => {
                ErrorSeverity::Recoverable
            }
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "FORMULA_EMPTY",
            Self::UnexpectedChar { .. } => "FORMULA_UNEXPECTED_CHAR",
            Self::UnexpectedToken { .. } => "FORMULA_UNEXPECTED_TOKEN",
            Self::UnexpectedEnd => "FORMULA_UNEXPECTED_END",
            Self::UnknownFunction(_) => "FORMULA_UNKNOWN_FUNCTION",
            Self::WrongArity { .. } => "FORMULA_WRONG_ARITY",
            Self::UnresolvedReference(_) => "FORMULA_UNRESOLVED_REFERENCE",
            Self::InvalidDice { .. } => "FORMULA_INVALID_DICE",
            Self::DiceNotAllowed => "FORMULA_DICE_NOT_ALLOWED",
            Self::DivisionByZero => "FORMULA_DIVISION_BY_ZERO",
            Self::NonFinite => "FORMULA_NON_FINITE",
            Self::TooDeep { .. } => "FORMULA_TOO_DEEP",
            Self::TooLong { .. } => "FORMULA_TOO_LONG",
        }
    }
}
