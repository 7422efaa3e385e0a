//! Error types for the filter crate

use thiserror::Error;

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors that can occur when parsing filter conditions
///
/// These surface only on loud construction paths (rule registration,
/// explicit validation). Runtime evaluation is fail-closed and never errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Condition string does not match the grammar
    #[error("invalid filter syntax in '{input}': {reason}")]
    Syntax {
        /// The offending condition string
        input: String,
        /// What went wrong
        reason: String,
    },
}

impl FilterError {
    /// Create a syntax error
    pub fn syntax(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Syntax {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
