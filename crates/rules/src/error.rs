//! Error types for the rules crate

use thiserror::Error;

use mqscope_filter::FilterError;

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Errors that can occur when building or registering rules
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule's filter condition failed to parse
    ///
    /// Rule registration is the one loud error path: a rule meant to be
    /// persistent is rejected immediately rather than silently matching
    /// nothing.
    #[error("rule '{id}' has an invalid filter: {source}")]
    InvalidFilter {
        /// Rule id
        id: String,
        /// Underlying syntax error
        #[source]
        source: FilterError,
    },

    /// A rule must have at least one action
    #[error("rule '{id}' has no actions")]
    NoActions {
        /// Rule id
        id: String,
    },
}

/// Errors raised by action execution
///
/// These are caught and logged by the engine; they never propagate to the
/// message producer.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action could not complete
    #[error("action failed: {0}")]
    Failed(String),
}

impl ActionError {
    /// Create a failure error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
