//! Asynchronous boundary for user decisions.
//!
//! Rest and repair workflows, and die rolls from mixed pools, may stop to ask
//! the user something. Runtime users plug in a [`DecisionProvider`] so the same
//! engine runs behind a UI dialog, a CLI prompt or a scripted test fixture.
//! Every prompt may be dismissed; the engine treats that as a clean abort.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rules_core::pools::DiceBucket;
use rules_core::{
    ActorId, DieSelection, PoolKind, PowerAllocation, ResourcePool, Subsystem, Workflow,
    WorkflowOptions,
};

/// Answer to a prompt.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision<T> {
    Chosen(T),
    Cancelled,
}

impl<T> Decision<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Chosen(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Confirm or adjust the options of a rest or repair.
#[derive(Clone, Debug)]
pub struct WorkflowPrompt {
    pub actor: ActorId,
    pub workflow: Workflow,
    /// Options after merging the request over the defaults.
    pub options: WorkflowOptions,
    /// Hit points, or hull points for starships.
    pub hp: ResourcePool,
    /// Hit dice, or hull dice for starships.
    pub dice: ResourcePool,
}

/// Distribute recovered power dice across subsystems.
#[derive(Clone, Debug)]
pub struct AllocationPrompt {
    pub actor: ActorId,
    pub recovered: u32,
    pub pools: BTreeMap<Subsystem, ResourcePool>,
    pub suggested: PowerAllocation,
}

/// Pick which die to spend from a pool with several denominations.
#[derive(Clone, Debug)]
pub struct DieChoicePrompt {
    pub actor: ActorId,
    pub pool: PoolKind,
    pub buckets: Vec<DiceBucket>,
}

#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn confirm_workflow(&self, prompt: &WorkflowPrompt) -> Decision<WorkflowOptions>;

    async fn allocate_power(&self, prompt: &AllocationPrompt) -> Decision<PowerAllocation>;

    async fn choose_die(&self, prompt: &DieChoicePrompt) -> Decision<DieSelection>;
}

/// Accepts every prompt with its default answer.
///
/// Useful for headless runs and as a fallback.
pub struct AcceptDefaults;

#[async_trait]
impl DecisionProvider for AcceptDefaults {
    async fn confirm_workflow(&self, prompt: &WorkflowPrompt) -> Decision<WorkflowOptions> {
        Decision::Chosen(prompt.options)
    }

    async fn allocate_power(&self, prompt: &AllocationPrompt) -> Decision<PowerAllocation> {
        Decision::Chosen(prompt.suggested.clone())
    }

    async fn choose_die(&self, _prompt: &DieChoicePrompt) -> Decision<DieSelection> {
        Decision::Chosen(DieSelection::default())
    }
}

/// Dismisses every prompt.
pub struct CancelAll;

#[async_trait]
impl DecisionProvider for CancelAll {
    async fn confirm_workflow(&self, _prompt: &WorkflowPrompt) -> Decision<WorkflowOptions> {
        Decision::Cancelled
    }

    async fn allocate_power(&self, _prompt: &AllocationPrompt) -> Decision<PowerAllocation> {
        Decision::Cancelled
    }

    async fn choose_die(&self, _prompt: &DieChoicePrompt) -> Decision<DieSelection> {
        Decision::Cancelled
    }
}
