//! Content loaders for reading rules data from files.
//!
//! The on-disk format is picked from the file extension; see [`DataFormat`].

pub mod config;
pub mod modifiers;
pub mod records;

pub use config::ConfigLoader;
pub use modifiers::ModifierLoader;
pub use records::RecordLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Serialization formats understood by the loaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Ron,
    Toml,
}

impl DataFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("ron") => Ok(Self::Ron),
            Some("toml") => Ok(Self::Toml),
            Some(other) => Err(anyhow::anyhow!(
                "Unsupported file extension '.{}' for {}",
                other,
                path.display()
            )),
            None => Err(anyhow::anyhow!(
                "Cannot detect format of {}: no file extension",
                path.display()
            )),
        }
    }

    pub(crate) fn parse<T: serde::de::DeserializeOwned>(
        self,
        content: &str,
        what: &str,
    ) -> LoadResult<T> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {} JSON: {}", what, e)),
            Self::Ron => ron::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {} RON: {}", what, e)),
            Self::Toml => toml::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {} TOML: {}", what, e)),
        }
    }
}

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
