//! Ruleset configuration loader.

use std::path::Path;

use rules_core::RulesetConfig;

use crate::loaders::{DataFormat, LoadResult, read_file};

/// Loader for [`RulesetConfig`] from TOML or RON files.
///
/// Every section is optional; missing sections and fields fall back to
/// [`RulesetConfig::standard`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a ruleset, picking the format from the extension.
    pub fn load(path: &Path) -> LoadResult<RulesetConfig> {
        let content = read_file(path)?;
        let config = match DataFormat::from_path(path)? {
            DataFormat::Toml => Self::from_toml_str(&content)?,
            DataFormat::Ron => Self::from_ron_str(&content)?,
            DataFormat::Json => {
                anyhow::bail!("Ruleset {} must be TOML or RON", path.display())
            }
        };
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> LoadResult<RulesetConfig> {
        let config: RulesetConfig = DataFormat::Toml.parse(content, "ruleset")?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn from_ron_str(content: &str) -> LoadResult<RulesetConfig> {
        let config: RulesetConfig = DataFormat::Ron.parse(content, "ruleset")?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject rulesets the derivation stages cannot use.
    pub fn validate(config: &RulesetConfig) -> LoadResult<()> {
        if config.abilities.is_empty() {
            anyhow::bail!("Ruleset declares no abilities");
        }
        for (skill, ability) in &config.skills {
            if !config.abilities.contains(ability) {
                anyhow::bail!("Skill '{}' uses unknown ability '{}'", skill, ability);
            }
        }
        for ability in [
            &config.hit_die_ability,
            &config.initiative_ability,
            &config.encumbrance.ability,
            &config.armor_class.ability,
        ] {
            if !config.abilities.contains(ability) {
                anyhow::bail!("Ruleset references unknown ability '{}'", ability);
            }
        }
        if config.proficiency_by_level.is_empty() {
            anyhow::bail!("Ruleset has an empty proficiency table");
        }
        for (track, rules) in &config.caster_tracks {
            if !rules.progressions.contains_key(&rules.npc_progression) {
                anyhow::bail!(
                    "Caster track '{}' uses unknown NPC progression '{}'",
                    track,
                    rules.npc_progression
                );
            }
        }
        for (name, ratio) in [
            ("hit_dice_ratio", config.rest.hit_dice_ratio),
            ("hull_dice_ratio", config.rest.hull_dice_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                anyhow::bail!("Rest {} must be within [0, 1], got {}", name, ratio);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_standard_tables() {
        let config = ConfigLoader::from_toml_str(
            r#"
            hit_die_ability = "wis"

            [rest]
            auto_dice_threshold = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.rest.auto_dice_threshold, 5);
        assert_eq!(config.rest.hit_dice_ratio, 1.0);
        assert_eq!(config.hit_die_ability.as_str(), "wis");
        assert_eq!(config.skills, RulesetConfig::standard().skills);
    }

    #[test]
    fn ron_ruleset_parses() {
        let config = ConfigLoader::from_ron_str("(rest: (hull_dice_ratio: 0.5))").unwrap();
        assert_eq!(config.rest.hull_dice_ratio, 0.5);
    }

    #[test]
    fn rejects_unknown_abilities() {
        let err = ConfigLoader::from_toml_str(r#"abilities = ["str", "dex"]"#).unwrap_err();
        assert!(err.to_string().contains("unknown ability"));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let err = ConfigLoader::from_toml_str("[rest]\nhit_dice_ratio = 2.0").unwrap_err();
        assert!(err.to_string().contains("hit_dice_ratio"));
    }

    #[test]
    fn reports_parse_errors() {
        let err = ConfigLoader::from_toml_str("abilities = 3").unwrap_err();
        assert!(err.to_string().contains("Failed to parse ruleset TOML"));
    }
}
