//! Run a rest or repair workflow against a record file

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use rules_core::{ActorRecord, RequestedOptions, Workflow, WorkflowResult};
use rules_runtime::{InMemoryRecordStore, RulesEngine, StaticModifiers, WorkflowOutcome};

use crate::utils::{Inputs, heading, signed, write_record};

/// Apply a rest or repair to a record file
#[derive(Parser)]
pub struct Rest {
    #[command(flatten)]
    inputs: Inputs,

    /// Workflow to run
    #[arg(short, long, value_enum, default_value = "short")]
    kind: Kind,

    /// Spend dice automatically until hit points are near full
    #[arg(long)]
    auto_dice: bool,

    /// Stop auto-spending once this close to maximum
    #[arg(long, value_name = "HP")]
    threshold: Option<u32>,

    /// Override whether the workflow starts a new day
    #[arg(long, value_name = "BOOL")]
    new_day: Option<bool>,

    /// Seed for dice rolls (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the outcome without touching the record file
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Kind {
    Short,
    Long,
    Recharge,
    Refitting,
    Regen,
}

impl From<Kind> for Workflow {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Short => Workflow::ShortRest,
            Kind::Long => Workflow::LongRest,
            Kind::Recharge => Workflow::RechargeRepair,
            Kind::Refitting => Workflow::RefittingRepair,
            Kind::Regen => Workflow::RegenRepair,
        }
    }
}

impl Rest {
    pub fn execute(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(self.run())
    }

    async fn run(self) -> Result<()> {
        let loaded = self.inputs.load()?;
        let id = loaded.record.id.clone();
        let workflow = Workflow::from(self.kind);

        let store = Arc::new(InMemoryRecordStore::with_records([loaded.record]));
        let mut builder = RulesEngine::builder()
            .config(loaded.config)
            .store(store)
            .modifiers(StaticModifiers::new().with(id.clone(), loaded.modifiers));
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        let engine = builder.build()?;

        let requested = RequestedOptions {
            dialog: Some(false),
            new_day: self.new_day,
            auto_dice: Some(self.auto_dice),
            auto_dice_threshold: self.threshold,
        };

        tracing::info!(actor = %id, %workflow, "running workflow");
        let report = match engine.run_workflow(&id, workflow, requested).await? {
            WorkflowOutcome::Completed(report) => report,
            WorkflowOutcome::Cancelled { workflow } => bail!("{workflow} was cancelled"),
        };

        print_result(&report.result);

        if self.dry_run {
            println!("{}", style("Dry run, record not written").dim());
        } else {
            save(&self.inputs.record, &report.record)?;
        }
        Ok(())
    }
}

fn save(path: &std::path::Path, record: &ActorRecord) -> Result<()> {
    write_record(path, record)?;
    println!("{} {}", style("Updated").green(), path.display());
    Ok(())
}

fn print_result(result: &WorkflowResult) {
    println!(
        "{} {}{}",
        style("Workflow").bold().cyan(),
        style(result.workflow).bold(),
        if result.new_day { " (new day)" } else { "" }
    );
    println!("{}", style("═".repeat(60)).dim());

    heading("Recovered");
    if result.deltas.is_empty() {
        println!("  {}", style("nothing").dim());
    }
    for (pool, delta) in &result.deltas {
        println!("  {:<22} {}", pool.to_string(), signed(*delta));
    }
    println!();

    if !result.dice_rolls.is_empty() {
        heading("Rolls");
        for roll in &result.dice_rolls {
            println!(
                "  {} d{} from {}: {} = {} (gained {})",
                roll.pool,
                roll.denomination,
                roll.source,
                roll.roll.formula,
                roll.roll.total,
                roll.gained
            );
        }
        println!();
    }

    if !result.item_uses.is_empty() {
        heading("Item uses");
        for uses in &result.item_uses {
            println!("  {:<22} {} -> {}", uses.item.to_string(), uses.before, uses.after);
        }
        println!();
    }

    for warning in &result.warnings {
        println!("  {} {}", style("warning:").red(), warning);
    }
}
