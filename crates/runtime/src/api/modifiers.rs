//! Source of active modifiers for a derivation pass.

use std::collections::HashMap;

use async_trait::async_trait;
use rules_core::{ActorId, ActorRecord, Modifier};

use super::errors::Result;

/// Read-only supplier of the modifiers that apply to a record.
///
/// Called once at the start of every derivation pass; suppression against the
/// record's items is resolved by the engine afterwards.
#[async_trait]
pub trait ModifierSource: Send + Sync {
    async fn modifiers(&self, record: &ActorRecord) -> Result<Vec<Modifier>>;
}

/// Fixed modifier lists keyed by actor.
#[derive(Clone, Debug, Default)]
pub struct StaticModifiers {
    by_actor: HashMap<ActorId, Vec<Modifier>>,
}

impl StaticModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, actor: impl Into<ActorId>, modifiers: Vec<Modifier>) -> Self {
        self.by_actor.insert(actor.into(), modifiers);
        self
    }
}

#[async_trait]
impl ModifierSource for StaticModifiers {
    async fn modifiers(&self, record: &ActorRecord) -> Result<Vec<Modifier>> {
        Ok(self.by_actor.get(&record.id).cloned().unwrap_or_default())
    }
}
