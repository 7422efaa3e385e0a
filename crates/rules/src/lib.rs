//! Rule engine and highlight actions for mqscope
//!
//! A `Rule` binds a filter condition to an ordered list of actions. The
//! `RuleEngine` evaluates every registered rule against each observed
//! message, in registration order, and executes the actions of matching
//! rules. Action failures are logged and contained - a misbehaving action
//! never stalls the tap pipeline or reaches the message producer.
//!
//! The built-in `HighlightAction` registers messages in a
//! `HighlightRegistry`, a weak message-scoped side table that downstream
//! renderers consult. The association never extends a message's lifetime.

mod action;
mod engine;
mod error;
mod highlight;

pub use action::{Action, HighlightAction, HighlightColor, HighlightInfo};
pub use engine::{Rule, RuleEngine};
pub use error::{ActionError, Result, RuleError};
pub use highlight::HighlightRegistry;
