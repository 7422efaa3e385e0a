//! Actions - side effects triggered by rule matches
//!
//! `Action` is the extension point for rule behavior. The engine hands
//! each action the fields its rule's condition referenced (already
//! extracted) plus the matched message. Actions must be quick: the engine
//! times every invocation and logs overruns, and errors are contained.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mqscope_protocol::{FieldValue, Message};

use crate::error::ActionError;
use crate::highlight::HighlightRegistry;

/// Highlight color tag
///
/// An open set of names rather than a closed enum - renderers map unknown
/// colors to a default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightColor(String);

impl HighlightColor {
    /// Create a color tag
    #[inline]
    pub fn new(color: impl Into<String>) -> Self {
        Self(color.into())
    }

    /// Get the color name
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HighlightColor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HighlightColor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Highlight details attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightInfo {
    /// Display color
    pub color: HighlightColor,
    /// Optional reason shown alongside the message
    pub reason: Option<String>,
}

impl HighlightInfo {
    /// Create highlight info
    pub fn new(color: impl Into<HighlightColor>, reason: Option<String>) -> Self {
        Self {
            color: color.into(),
            reason,
        }
    }
}

/// A side-effecting behavior triggered by a rule match
pub trait Action: Send + Sync + fmt::Debug {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Execute against a matched message
    ///
    /// `fields` holds the values extracted for the rule condition's field
    /// references. Must not block materially; the engine logs slow and
    /// failing invocations but cannot preempt them.
    fn execute(
        &self,
        fields: &HashMap<String, FieldValue>,
        message: &Arc<Message>,
    ) -> std::result::Result<(), ActionError>;
}

/// Action that highlights matched messages
///
/// Registers the message in a `HighlightRegistry` with a color and an
/// optional reason. Re-matching the same message overwrites the previous
/// info (last write wins).
#[derive(Debug)]
pub struct HighlightAction {
    registry: Arc<HighlightRegistry>,
    color: HighlightColor,
    reason: Option<String>,
}

impl HighlightAction {
    /// Create a highlight action
    pub fn new(registry: Arc<HighlightRegistry>, color: impl Into<HighlightColor>) -> Self {
        Self {
            registry,
            color: color.into(),
            reason: None,
        }
    }

    /// Attach a reason shown alongside highlighted messages
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Action for HighlightAction {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn execute(
        &self,
        _fields: &HashMap<String, FieldValue>,
        message: &Arc<Message>,
    ) -> std::result::Result<(), ActionError> {
        self.registry.insert(
            message,
            HighlightInfo::new(self.color.clone(), self.reason.clone()),
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
