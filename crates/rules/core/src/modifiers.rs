//! Modifier resolution.
//!
//! Modifiers target a dotted path into the actor (`abilities.dex.value`,
//! `attributes.ac.bonus`, `flags.powerfulBuild`) and are combined in a fixed
//! order before any derived stage reads them:
//!
//! ```text
//! suppression pre-pass -> group by path -> sort by (priority, insertion) -> fold over base
//! ```
//!
//! Suppression needs the owning item's state, so it runs as its own pass
//! ([`resolve_suppression`]) rather than being folded in with the values.
//! The resolved [`ModifierMap`] never mutates the record: stages fold each
//! stack over the stored base value, which keeps re-derivation idempotent.

use std::collections::BTreeMap;

use crate::ids::ItemId;
use crate::record::ActorRecord;

/// How a modifier combines with the value beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[strum(serialize_all = "lowercase")]
pub enum ModifierOperation {
    Multiply,
    Add,
    /// Keep the lower of the current value and the modifier.
    Downgrade,
    /// Keep the higher of the current value and the modifier.
    Upgrade,
    Override,
}

impl ModifierOperation {
    /// Priority used when a modifier does not set one explicitly.
    ///
    /// Multiplication folds first and overrides last, so an override always
    /// wins unless another modifier outranks it explicitly.
    pub const fn default_priority(self) -> i32 {
        match self {
            Self::Multiply => 10,
            Self::Add => 20,
            Self::Downgrade => 30,
            Self::Upgrade => 40,
            Self::Override => 50,
        }
    }
}

/// Modifier payload: a number for numeric paths, a flag for boolean paths.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum ModifierValue {
    Flag(bool),
    Number(f64),
}

impl ModifierValue {
    pub fn as_number(self) -> f64 {
        match self {
            Self::Number(value) => value,
            Self::Flag(flag) => f64::from(u8::from(flag)),
        }
    }

    pub fn as_flag(self) -> bool {
        match self {
            Self::Flag(flag) => flag,
            Self::Number(value) => value != 0.0,
        }
    }
}

impl From<f64> for ModifierValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ModifierValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for ModifierValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// A single active modifier as delivered by the modifier source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Modifier {
    pub target_path: String,
    pub operation: ModifierOperation,
    pub value: ModifierValue,
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: Option<i32>,
    /// Owning item; the modifier is suppressed while that item is inactive.
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_item: Option<ItemId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub suppressed: bool,
}

impl Modifier {
    pub fn new(
        target_path: impl Into<String>,
        operation: ModifierOperation,
        value: impl Into<ModifierValue>,
    ) -> Self {
        Self {
            target_path: target_path.into(),
            operation,
            value: value.into(),
            priority: None,
            source_item: None,
            suppressed: false,
        }
    }

    pub fn add(target_path: impl Into<String>, value: impl Into<ModifierValue>) -> Self {
        Self::new(target_path, ModifierOperation::Add, value)
    }

    pub fn override_with(target_path: impl Into<String>, value: impl Into<ModifierValue>) -> Self {
        Self::new(target_path, ModifierOperation::Override, value)
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn from_item(mut self, item: impl Into<ItemId>) -> Self {
        self.source_item = Some(item.into());
        self
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority
            .unwrap_or_else(|| self.operation.default_priority())
    }
}

/// Suppression pre-pass.
///
/// Marks every modifier whose source item is missing from the record or is
/// currently inactive (unequipped gear, uninstalled starship equipment).
/// Modifiers already flagged stay suppressed.
pub fn resolve_suppression(record: &ActorRecord, modifiers: &[Modifier]) -> Vec<Modifier> {
    modifiers
        .iter()
        .map(|modifier| {
            let inactive = modifier
                .source_item
                .as_ref()
                .is_some_and(|id| !record.item(id).is_some_and(|item| item.is_active()));
            Modifier {
                suppressed: modifier.suppressed || inactive,
                ..modifier.clone()
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct StackEntry {
    operation: ModifierOperation,
    value: ModifierValue,
    priority: i32,
    order: usize,
}

/// Ordered modifiers targeting one path.
///
/// Entries fold in ascending priority; ties keep insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModifierStack {
    entries: Vec<StackEntry>,
}

impl ModifierStack {
    fn push(&mut self, modifier: &Modifier, order: usize) {
        let entry = StackEntry {
            operation: modifier.operation,
            value: modifier.value,
            priority: modifier.effective_priority(),
            order,
        };
        let at = self
            .entries
            .partition_point(|e| (e.priority, e.order) <= (entry.priority, entry.order));
        self.entries.insert(at, entry);
    }

    /// Fold the stack over a numeric base value.
    pub fn apply(&self, base: f64) -> f64 {
        self.entries.iter().fold(base, |acc, entry| {
            let value = entry.value.as_number();
            match entry.operation {
                ModifierOperation::Multiply => acc * value,
                ModifierOperation::Add => acc + value,
                ModifierOperation::Downgrade => acc.min(value),
                ModifierOperation::Upgrade => acc.max(value),
                ModifierOperation::Override => value,
            }
        })
    }

    /// Fold the stack over a boolean base value.
    ///
    /// Upgrades and additions can only raise a flag, downgrades and
    /// multiplications can only clear it.
    pub fn apply_flag(&self, base: bool) -> bool {
        self.entries.iter().fold(base, |acc, entry| {
            let value = entry.value.as_flag();
            match entry.operation {
                ModifierOperation::Add | ModifierOperation::Upgrade => acc || value,
                ModifierOperation::Multiply | ModifierOperation::Downgrade => acc && value,
                ModifierOperation::Override => value,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Bound on integer values realized from modifiers.
pub const INT_LIMIT: i32 = 1_000_000;

/// Resolved modifiers keyed by target path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModifierMap {
    stacks: BTreeMap<String, ModifierStack>,
}

impl ModifierMap {
    /// Group non-suppressed modifiers into ordered per-path stacks.
    pub fn resolve(modifiers: &[Modifier]) -> Self {
        let mut stacks: BTreeMap<String, ModifierStack> = BTreeMap::new();
        for (order, modifier) in modifiers.iter().enumerate() {
            if modifier.suppressed {
                continue;
            }
            stacks
                .entry(modifier.target_path.clone())
                .or_default()
                .push(modifier, order);
        }
        Self { stacks }
    }

    pub fn has(&self, path: &str) -> bool {
        self.stacks.contains_key(path)
    }

    pub fn stack(&self, path: &str) -> Option<&ModifierStack> {
        self.stacks.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    pub fn number(&self, path: &str, base: f64) -> f64 {
        self.stacks
            .get(path)
            .map_or(base, |stack| stack.apply(base))
    }

    /// Integer view of [`Self::number`], rounded down and clamped to
    /// `±INT_LIMIT`.
    pub fn int(&self, path: &str, base: i32) -> i32 {
        match self.stacks.get(path) {
            Some(stack) => {
                let limit = f64::from(INT_LIMIT);
                stack.apply(f64::from(base)).floor().clamp(-limit, limit) as i32
            }
            None => base,
        }
    }

    pub fn flag(&self, path: &str, base: bool) -> bool {
        self.stacks
            .get(path)
            .map_or(base, |stack| stack.apply_flag(base))
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
