//! Core message types for mqscope
//!
//! This crate defines the `Message` struct that flows through the tap
//! pipeline, plus the scalar `FieldValue` type produced by field extraction.
//!
//! Messages are created by the broker/client publish hooks, shared as
//! `Arc<Message>` for zero-copy fan-out, and never mutated after
//! construction. Equality is identity-based: two messages with the same
//! content are still distinct observations on the wire, so `Message` does
//! not implement `PartialEq`.

mod message;
mod value;

pub use message::{Direction, Message, MessageBuilder, QosLevel};
pub use value::FieldValue;
