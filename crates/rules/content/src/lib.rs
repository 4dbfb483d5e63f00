//! Data-driven ruleset and record loaders.
//!
//! This crate reads the inputs of a derivation pass from files:
//! - Ruleset configuration (TOML or RON)
//! - Actor records (JSON or RON)
//! - Modifier lists (JSON or RON)
//!
//! Loaders return `rules-core` types directly; nothing here interprets rules.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, DataFormat, LoadResult, ModifierLoader, RecordLoader};
