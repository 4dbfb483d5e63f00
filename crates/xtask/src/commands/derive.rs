//! Derive a record file and print the result

use anyhow::Result;
use clap::Parser;
use console::style;
use rules_core::{Derivation, ResourcePool, RulesError, derive};
use serde_json::{Value, json};

use crate::utils::{Inputs, format_pool, heading, signed};

/// Run a derivation pass over a record file
#[derive(Parser)]
pub struct Derive {
    #[command(flatten)]
    inputs: Inputs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Write synthesized base data back into the record file
    #[arg(long)]
    write: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Summary,
    /// JSON output
    Json,
    /// Full derived actor (Rust debug format)
    Debug,
}

impl Derive {
    pub fn execute(self) -> Result<()> {
        let loaded = self.inputs.load()?;
        let derivation = derive(&loaded.record, &loaded.modifiers, &loaded.config);

        match self.format {
            OutputFormat::Summary => print_summary(&derivation),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&derivation))?),
            OutputFormat::Debug => println!("{:#?}", derivation.actor),
        }

        if self.write {
            if derivation.patch.is_some() {
                crate::utils::write_record(&self.inputs.record, &derivation.record)?;
                println!(
                    "{} {}",
                    style("Wrote base data to").green(),
                    self.inputs.record.display()
                );
            } else {
                println!("{}", style("Record already complete, nothing written").dim());
            }
        }

        Ok(())
    }
}

fn print_summary(derivation: &Derivation) {
    let actor = &derivation.actor;
    println!(
        "{} {} ({})",
        style("Actor").bold().cyan(),
        style(&derivation.record.id).bold(),
        actor.kind
    );
    println!("{}", style("═".repeat(60)).dim());

    if !actor.abilities.is_empty() {
        heading("Abilities");
        for (id, ability) in &actor.abilities {
            println!(
                "  {:<4} {:>3} ({})  save {}  dc {}",
                id.to_string(),
                ability.value,
                signed(ability.modifier),
                signed(ability.save),
                ability.dc
            );
        }
        println!();
    }

    heading("Defenses");
    println!("  Proficiency: {}", signed(actor.prof));
    println!("  AC:          {} ({})", actor.ac.value, actor.ac.calc.as_str());
    println!("  HP:          {}", format_pool(&actor.hp.pool));
    if actor.hp.temp > 0 {
        println!("  Temp HP:     {}", actor.hp.temp);
    }
    println!("  Initiative:  {}", signed(actor.initiative.total));
    println!(
        "  Load:        {:.1}/{:.1}{}",
        actor.encumbrance.value,
        actor.encumbrance.max,
        if actor.encumbrance.encumbered {
            " (encumbered)"
        } else {
            ""
        }
    );
    println!();

    if !actor.skills.is_empty() {
        heading("Skills");
        for (id, skill) in &actor.skills {
            println!(
                "  {:<6} {:>3}  passive {}",
                id.to_string(),
                signed(skill.total),
                skill.passive
            );
        }
        println!();
    }

    let pools = resource_pools(derivation);
    if !pools.is_empty() {
        heading("Resources");
        for pool in pools {
            println!("  {:<22} {}", pool.kind.to_string(), format_pool(&pool));
        }
        println!();
    }

    if let Some(ship) = &actor.starship {
        heading("Starship");
        println!("  Tier:            {}", ship.tier);
        println!("  Power die:       d{}", ship.power_die);
        println!("  Damage reduct.:  {}", ship.damage_reduction);
        println!("  Shield regen:    {}", ship.shield_regen);
        println!("  Power recovery:  {}", ship.power_recovery);
        if ship.shields_depleted {
            println!("  {}", style("Shields depleted").red());
        }
        println!();
    }

    if derivation.warnings.is_empty() {
        println!("{}", style("No warnings").green());
    } else {
        heading("Warnings");
        for warning in &derivation.warnings {
            println!(
                "  {} {}",
                style(format!("[{}]", warning.error_code())).red(),
                warning
            );
        }
    }
}

/// Every pool the derivation exposes, in display order.
fn resource_pools(derivation: &Derivation) -> Vec<ResourcePool> {
    let actor = &derivation.actor;
    let mut pools = Vec::new();
    pools.extend(actor.hit_dice);
    pools.extend(actor.powercasting.values().map(|track| track.points));
    pools.extend(actor.superiority.as_ref().map(|sup| sup.dice));
    if let Some(ship) = &actor.starship {
        pools.push(ship.hull_dice);
        pools.push(ship.shield_dice);
        pools.push(ship.shield_points);
        pools.extend(ship.power_dice.values().copied());
    }
    pools
}

fn pool_json(pool: &ResourcePool) -> Value {
    json!({
        "value": pool.current(),
        "max": pool.max(),
        "denomination": pool.denomination,
    })
}

fn to_json(derivation: &Derivation) -> Value {
    let actor = &derivation.actor;
    let abilities: serde_json::Map<String, Value> = actor
        .abilities
        .iter()
        .map(|(id, ability)| {
            (
                id.to_string(),
                json!({
                    "value": ability.value,
                    "mod": ability.modifier,
                    "save": ability.save,
                    "dc": ability.dc,
                }),
            )
        })
        .collect();
    let skills: serde_json::Map<String, Value> = actor
        .skills
        .iter()
        .map(|(id, skill)| {
            (
                id.to_string(),
                json!({ "total": skill.total, "passive": skill.passive }),
            )
        })
        .collect();
    let resources: serde_json::Map<String, Value> = resource_pools(derivation)
        .iter()
        .map(|pool| (pool.kind.to_string(), pool_json(pool)))
        .collect();

    json!({
        "id": derivation.record.id.to_string(),
        "kind": actor.kind.to_string(),
        "prof": actor.prof,
        "abilities": abilities,
        "skills": skills,
        "ac": actor.ac.value,
        "hp": pool_json(&actor.hp.pool),
        "initiative": actor.initiative.total,
        "encumbrance": {
            "value": actor.encumbrance.value,
            "max": actor.encumbrance.max,
            "encumbered": actor.encumbrance.encumbered,
        },
        "resources": resources,
        "warnings": derivation
            .warnings
            .iter()
            .map(|warning| json!({ "code": warning.error_code(), "message": warning.to_string() }))
            .collect::<Vec<_>>(),
    })
}
