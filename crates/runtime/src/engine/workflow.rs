//! Rest and repair orchestration.
//!
//! Each workflow walks `Configuring -> Dialog -> Computing -> Applying ->
//! Reporting`. It suspends only on the optional dialog and on the final writes;
//! every recovery is computed before anything is persisted, so a cancelled
//! dialog leaves the record untouched.

use rules_core::{
    ActorId, ActorRecord, DicePool, OwnedItem, PoolKind, PowerAllocation, RepairKind,
    RequestedOptions, ResourcePool, RestKind, Workflow, WorkflowOptions, WorkflowResult,
    compute_workflow,
};

use super::{RulesEngine, with_patch};
use crate::api::{AllocationPrompt, Decision, Result, RuntimeError, WorkflowPrompt};

/// Phase of a running workflow, reported in traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowPhase {
    Configuring,
    Dialog,
    Computing,
    Applying,
    Reporting,
}

/// Everything a completed workflow produced.
#[derive(Clone, Debug)]
pub struct WorkflowReport {
    pub result: WorkflowResult,
    /// Record as stored after both writes.
    pub record: ActorRecord,
    /// Items returned by the batch write.
    pub items: Vec<OwnedItem>,
}

#[derive(Clone, Debug)]
pub enum WorkflowOutcome {
    Completed(Box<WorkflowReport>),
    /// The user dismissed a dialog; nothing was written.
    Cancelled { workflow: Workflow },
}

impl WorkflowOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn report(&self) -> Option<&WorkflowReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Cancelled { .. } => None,
        }
    }
}

fn trace_phase(actor: &ActorId, workflow: Workflow, phase: WorkflowPhase) {
    tracing::debug!(actor = %actor, %workflow, ?phase, "workflow phase");
}

impl RulesEngine {
    pub async fn rest(
        &self,
        id: &ActorId,
        kind: RestKind,
        requested: RequestedOptions,
    ) -> Result<WorkflowOutcome> {
        self.run_workflow(id, kind.into(), requested).await
    }

    /// Run a starship repair. Fails for anything without a starship block.
    pub async fn repair(
        &self,
        id: &ActorId,
        kind: RepairKind,
        requested: RequestedOptions,
    ) -> Result<WorkflowOutcome> {
        self.run_workflow(id, kind.into(), requested).await
    }

    pub async fn run_workflow(
        &self,
        id: &ActorId,
        workflow: Workflow,
        requested: RequestedOptions,
    ) -> Result<WorkflowOutcome> {
        let derivation = self.derivation(id).await?;
        if workflow.is_repair() && derivation.actor.starship.is_none() {
            return Err(RuntimeError::NotAStarship {
                actor: id.clone(),
                kind: derivation.actor.kind,
            });
        }

        trace_phase(id, workflow, WorkflowPhase::Configuring);
        let mut options = WorkflowOptions::defaults(workflow, self.config()).merge(&requested);
        let mut allocation = PowerAllocation::default();

        if options.dialog {
            trace_phase(id, workflow, WorkflowPhase::Dialog);
            let dice = if workflow.is_repair() {
                DicePool::hull_dice(&derivation.record, self.config()).summary()
            } else {
                derivation
                    .actor
                    .hit_dice
                    .unwrap_or_else(|| ResourcePool::new(PoolKind::HitDice, 0, 0))
            };
            let prompt = WorkflowPrompt {
                actor: id.clone(),
                workflow,
                options,
                hp: derivation.actor.hp.pool,
                dice,
            };
            match self.decisions.confirm_workflow(&prompt).await {
                Decision::Chosen(chosen) => options = chosen,
                Decision::Cancelled => {
                    tracing::info!(actor = %id, %workflow, "workflow cancelled");
                    return Ok(WorkflowOutcome::Cancelled { workflow });
                }
            }

            if workflow == Workflow::RechargeRepair {
                if let Some(ship) = derivation.actor.starship.as_ref() {
                    if ship.power_recovery > 0 {
                        let prompt = AllocationPrompt {
                            actor: id.clone(),
                            recovered: ship.power_recovery,
                            pools: ship.power_dice.clone(),
                            suggested: allocation.clone(),
                        };
                        match self.decisions.allocate_power(&prompt).await {
                            Decision::Chosen(chosen) => allocation = chosen,
                            Decision::Cancelled => {
                                tracing::info!(actor = %id, %workflow, "workflow cancelled");
                                return Ok(WorkflowOutcome::Cancelled { workflow });
                            }
                        }
                    }
                }
            }
        }

        trace_phase(id, workflow, WorkflowPhase::Computing);
        let result = compute_workflow(
            &derivation,
            workflow,
            options,
            &allocation,
            self.config(),
            self.roller.as_ref(),
        );
        for roll in &result.dice_rolls {
            tracing::debug!(
                actor = %id,
                pool = %roll.pool,
                source = %roll.source,
                roll = roll.roll.total,
                gained = roll.gained,
                "spent die"
            );
        }
        for (pool, delta) in &result.deltas {
            tracing::debug!(actor = %id, %pool, delta, "pool recovered");
        }
        for warning in &result.warnings {
            tracing::warn!(actor = %id, %workflow, "{}", warning);
        }

        trace_phase(id, workflow, WorkflowPhase::Applying);
        let update = with_patch(&derivation, result.actor_update.clone());
        let mut record = self.store.update_record(id, &update).await?;
        let items = match self.store.update_items(id, &result.item_updates).await {
            Ok(items) => items,
            Err(err) => {
                tracing::error!(
                    actor = %id,
                    %workflow,
                    error = %err,
                    "record written but item batch failed"
                );
                return Err(err.into());
            }
        };
        for item in &result.item_updates {
            record.apply_item_update(item);
        }

        trace_phase(id, workflow, WorkflowPhase::Reporting);
        tracing::info!(
            actor = %id,
            %workflow,
            new_day = result.new_day,
            pools = result.deltas.len(),
            items = items.len(),
            "workflow completed"
        );
        Ok(WorkflowOutcome::Completed(Box::new(WorkflowReport {
            result,
            record,
            items,
        })))
    }
}
