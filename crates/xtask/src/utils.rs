//! Utility functions for xtask commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use rules_content::{ConfigLoader, ModifierLoader, RecordLoader};
use rules_core::{ActorRecord, Modifier, ResourcePool, RulesetConfig};

/// Input files shared by every command.
#[derive(Args)]
pub struct Inputs {
    /// Actor record (JSON or RON)
    #[arg(value_name = "RECORD")]
    pub record: PathBuf,

    /// Active modifiers for the record (JSON or RON)
    #[arg(short, long, value_name = "FILE")]
    pub modifiers: Option<PathBuf>,

    /// Ruleset configuration (TOML or RON); defaults to the built-in ruleset
    #[arg(short, long, value_name = "FILE")]
    pub ruleset: Option<PathBuf>,
}

/// Everything loaded from [`Inputs`].
pub struct Loaded {
    pub record: ActorRecord,
    pub modifiers: Vec<Modifier>,
    pub config: RulesetConfig,
}

impl Inputs {
    pub fn load(&self) -> Result<Loaded> {
        let record = RecordLoader::load(&self.record)
            .with_context(|| format!("Failed to load record {}", self.record.display()))?;
        let modifiers = match &self.modifiers {
            Some(path) => ModifierLoader::load(path)?,
            None => Vec::new(),
        };
        let config = match &self.ruleset {
            Some(path) => ConfigLoader::load(path)?,
            None => RulesetConfig::standard(),
        };
        tracing::debug!(
            record = %record.id,
            modifiers = modifiers.len(),
            "loaded inputs"
        );
        Ok(Loaded {
            record,
            modifiers,
            config,
        })
    }
}

/// Write a record back as pretty JSON, via a temp file.
pub fn write_record(path: &Path, record: &ActorRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

pub fn heading(text: &str) {
    println!("{}", style(text).bold().yellow());
}

pub fn format_pool(pool: &ResourcePool) -> String {
    match pool.denomination {
        Some(faces) => format!("{}/{} (d{})", pool.current(), pool.max(), faces),
        None => format!("{}/{}", pool.current(), pool.max()),
    }
}

pub fn signed(value: i32) -> String {
    if value >= 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}
