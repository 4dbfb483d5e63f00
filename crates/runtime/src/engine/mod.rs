//! Async rules engine.
//!
//! [`RulesEngine`] wires the pure `rules-core` pipeline to the outside world:
//! it loads records from a [`RecordStore`], asks a [`ModifierSource`] for the
//! active modifiers, runs the derivation, and persists exactly the writes an
//! operation produced. Rest and repair workflows live in [`workflow`], direct
//! spend and roll operations in [`resources`].

pub mod resources;
pub mod workflow;

use std::sync::Arc;

use rules_core::{
    ActorId, ActorRecord, ActorUpdate, Derivation, DiceRoller, ItemUpdate, RulesetConfig,
    SeededRoller, derive,
};

use crate::api::{
    AcceptDefaults, DecisionProvider, ModifierSource, Result, RuntimeError, StaticModifiers,
};
use crate::repository::RecordStore;

pub use workflow::{WorkflowOutcome, WorkflowPhase, WorkflowReport};

/// Cloneable handle to the rules engine.
///
/// All collaborators are shared; clones drive the same store.
#[derive(Clone)]
pub struct RulesEngine {
    config: Arc<RulesetConfig>,
    store: Arc<dyn RecordStore>,
    modifiers: Arc<dyn ModifierSource>,
    decisions: Arc<dyn DecisionProvider>,
    roller: Arc<dyn DiceRoller>,
}

impl RulesEngine {
    /// Create a new engine builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &RulesetConfig {
        &self.config
    }

    pub async fn load(&self, id: &ActorId) -> Result<ActorRecord> {
        Ok(self.store.load(id).await?)
    }

    /// Run a derivation pass and persist the Base Stage patch, if any.
    ///
    /// Re-deriving an unchanged record issues no write.
    pub async fn derive(&self, id: &ActorId) -> Result<Derivation> {
        let derivation = self.derivation(id).await?;
        if let Some(patch) = &derivation.patch {
            tracing::debug!(actor = %id, "persisting synthesized base data");
            self.store.update_record(id, patch).await?;
        }
        Ok(derivation)
    }

    /// Derive without persisting anything.
    pub(crate) async fn derivation(&self, id: &ActorId) -> Result<Derivation> {
        let record = self.store.load(id).await?;
        let modifiers = self.modifiers.modifiers(&record).await?;
        let derivation = derive(&record, &modifiers, &self.config);

        for warning in &derivation.warnings {
            tracing::warn!(actor = %id, code = rules_core::RulesError::error_code(warning), "{}", warning);
        }
        tracing::debug!(
            actor = %id,
            kind = %derivation.actor.kind,
            modifiers = modifiers.len(),
            warnings = derivation.warnings.len(),
            "derivation pass complete"
        );
        Ok(derivation)
    }

    /// Persist an operation's writes, folding in the derivation patch.
    ///
    /// Issues at most one record update and one item batch; empty ones are
    /// skipped. Returns the record as stored afterwards.
    pub(crate) async fn persist(
        &self,
        id: &ActorId,
        derivation: &Derivation,
        update: ActorUpdate,
        items: &[ItemUpdate],
    ) -> Result<ActorRecord> {
        let update = with_patch(derivation, update);

        let mut record = if update.is_empty() {
            derivation.record.clone()
        } else {
            self.store.update_record(id, &update).await?
        };
        if !items.is_empty() {
            self.store.update_items(id, items).await?;
            for item in items {
                record.apply_item_update(item);
            }
        }
        Ok(record)
    }
}

/// The derivation patch with `update` applied over it.
pub(crate) fn with_patch(derivation: &Derivation, update: ActorUpdate) -> ActorUpdate {
    let mut merged = derivation.patch.clone().unwrap_or_default();
    merged.merge(update);
    merged
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Builder for [`RulesEngine`].
///
/// Only the store is required. Defaults: the standard ruleset, no modifiers,
/// every prompt answered with its default, and a clock-seeded roller.
pub struct EngineBuilder {
    config: RulesetConfig,
    store: Option<Arc<dyn RecordStore>>,
    modifiers: Option<Arc<dyn ModifierSource>>,
    decisions: Option<Arc<dyn DecisionProvider>>,
    roller: Option<Arc<dyn DiceRoller>>,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            config: RulesetConfig::standard(),
            store: None,
            modifiers: None,
            decisions: None,
            roller: None,
        }
    }

    /// Override the ruleset.
    pub fn config(mut self, config: RulesetConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the required record store.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn modifiers(mut self, modifiers: impl ModifierSource + 'static) -> Self {
        self.modifiers = Some(Arc::new(modifiers));
        self
    }

    pub fn decisions(mut self, decisions: impl DecisionProvider + 'static) -> Self {
        self.decisions = Some(Arc::new(decisions));
        self
    }

    pub fn roller(mut self, roller: impl DiceRoller + 'static) -> Self {
        self.roller = Some(Arc::new(roller));
        self
    }

    /// Use a deterministic roller with the given seed.
    pub fn seed(self, seed: u64) -> Self {
        self.roller(SeededRoller::new(seed))
    }

    /// Build the engine
    pub fn build(self) -> Result<RulesEngine> {
        let store = self.store.ok_or(RuntimeError::MissingStore)?;
        Ok(RulesEngine {
            config: Arc::new(self.config),
            store,
            modifiers: self
                .modifiers
                .unwrap_or_else(|| Arc::new(StaticModifiers::new())),
            decisions: self.decisions.unwrap_or_else(|| Arc::new(AcceptDefaults)),
            roller: self
                .roller
                .unwrap_or_else(|| Arc::new(SeededRoller::new(clock_seed()))),
        })
    }
}
