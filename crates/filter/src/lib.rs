//! Filter expression engine for mqscope
//!
//! Parses and evaluates SQL-like filter conditions over observed MQTT
//! messages, e.g. `topic like 'sensors/#' and qos = 1`. A condition string
//! is tokenized with a parenthesis-depth counter, folded strictly
//! left-to-right (no operator precedence), and evaluated against message
//! fields resolved by the extraction layer.
//!
//! # Filter Logic
//!
//! - An empty `FilterExpression` matches everything
//! - Clauses combine in declaration order: `BASE`, then `AND` / `OR` /
//!   `AND NOT` fold onto the running result
//! - Unparseable conditions evaluate to `false` (fail-closed) - a bad
//!   filter hides traffic, it never crashes the tap
//!
//! # Example
//!
//! ```
//! use mqscope_filter::FilterExpression;
//! use mqscope_protocol::{MessageBuilder, QosLevel};
//!
//! let filter = FilterExpression::where_clause("topic like 'sensors/#'")
//!     .and("qos = 1");
//!
//! let msg = MessageBuilder::new("sensors/room1/temp")
//!     .qos(QosLevel::AtLeastOnce)
//!     .finish();
//! assert!(filter.matches(&msg));
//! ```

mod condition;
mod error;
mod expression;
mod field;
mod like;
mod topic;

pub use condition::{BoolOp, CompareOp, Condition, parse_condition};
pub use error::{FilterError, Result};
pub use expression::{ClauseOp, FilterClause, FilterExpression};
pub use field::extract;
pub use like::like_matches;
pub use topic::topic_matches;
