//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod derive;
mod rest;

pub use derive::Derive;
pub use rest::Rest;
