//! Modifier list loader.

use std::path::Path;

use rules_core::Modifier;

use crate::loaders::{DataFormat, LoadResult, read_file};

/// Loader for a flat list of [`Modifier`]s from JSON or RON files.
pub struct ModifierLoader;

impl ModifierLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<Modifier>> {
        let content = read_file(path)?;
        let format = DataFormat::from_path(path)?;
        if format == DataFormat::Toml {
            anyhow::bail!("Modifier list {} must be JSON or RON", path.display());
        }
        let modifiers: Vec<Modifier> = format.parse(&content, "modifier list")?;
        for modifier in &modifiers {
            if modifier.target_path.trim().is_empty() {
                anyhow::bail!("Modifier with an empty target path in {}", path.display());
            }
        }
        Ok(modifiers)
    }

    pub fn from_json_str(content: &str) -> LoadResult<Vec<Modifier>> {
        DataFormat::Json.parse(content, "modifier list")
    }
}
