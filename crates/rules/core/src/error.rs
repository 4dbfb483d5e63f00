//! Common error infrastructure for rules-core.
//!
//! Domain errors live next to the code that produces them (`FormulaError` in
//! [`crate::formula`], `InsufficientResource` in [`crate::pools`]). This module
//! holds the classification shared by all of them.
//!
//! Derivation itself never fails: recoverable problems found mid-pass are
//! collected as [`crate::DerivationWarning`] values instead.

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The caller may retry with different input or simply report it.
    ///
    /// Examples: pool exhausted, formula rejected and replaced by a fallback
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: unknown item, actor of the wrong kind
    Validation,

    /// Unexpected state inconsistency; indicates a bug or corrupted data.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all rules-core errors.
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait RulesError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
