//! Async orchestration for the rules engine.
//!
//! This crate wires the pure `rules-core` pipeline to persistence, modifier
//! sources and user decisions. Consumers build a [`RulesEngine`] and call it
//! to derive records, run rests and repairs, and spend resources.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the engine, its builder and the workflow state machine
//! - [`api`] exposes the boundary traits and error types clients interact with
//! - [`repository`] provides record stores reused by tools and tests
pub mod api;
pub mod engine;
pub mod repository;

pub use api::{
    AcceptDefaults, AllocationPrompt, CancelAll, Decision, DecisionProvider, DieChoicePrompt,
    ModifierSource, Result, RuntimeError, StaticModifiers, StoreError, WorkflowPrompt,
};
pub use engine::{EngineBuilder, RulesEngine, WorkflowOutcome, WorkflowPhase, WorkflowReport};
pub use repository::{FileRecordStore, InMemoryRecordStore, RecordStore};
