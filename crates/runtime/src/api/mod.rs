//! Public API surface of the runtime crate.
//!
//! Re-exports the boundary traits runtime users implement (decisions and
//! modifiers) together with the unified error type.
pub mod errors;
pub mod modifiers;
pub mod prompts;

pub use errors::{Result, RuntimeError, StoreError};
pub use modifiers::{ModifierSource, StaticModifiers};
pub use prompts::{
    AcceptDefaults, AllocationPrompt, CancelAll, Decision, DecisionProvider, DieChoicePrompt,
    WorkflowPrompt,
};
