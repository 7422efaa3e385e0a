//! Wire protocol for tap client connections
//!
//! Defines the frames exchanged between `TapServer` and debug clients.
//! Simple length-prefixed binary format so non-Rust clients can attach.
//!
//! # Wire Format
//!
//! All frames are length-prefixed:
//! ```text
//! ┌──────────────┬─────────────────────────────────────┐
//! │ 4 bytes      │ N bytes                             │
//! │ length (BE)  │ payload                             │
//! └──────────────┴─────────────────────────────────────┘
//! ```
//!
//! # Frame Types
//!
//! - `Subscribe` (0x01): Client → Server, filter clauses + rate limit
//! - `Message` (0x02): Server → Client, matched message envelope
//! - `Heartbeat` (0x03): Server → Client, keep-alive
//! - `Error` (0x04): Server → Client, error message
//! - `SetFilter` (0x05): Client → Server, replace the filter mid-session

use bytes::{Buf, BufMut, Bytes, BytesMut};

use mqscope_filter::{ClauseOp, FilterExpression};

use crate::client::TapItem;
use crate::error::{Result, TapError};

/// Frame type discriminants
const MSG_SUBSCRIBE: u8 = 0x01;
const MSG_MESSAGE: u8 = 0x02;
const MSG_HEARTBEAT: u8 = 0x03;
const MSG_ERROR: u8 = 0x04;
const MSG_SET_FILTER: u8 = 0x05;

/// Frames exchanged between tap server and clients
#[derive(Debug, Clone, PartialEq)]
pub enum TapMessage {
    /// Client → Server: subscribe with filter criteria
    Subscribe(SubscribeRequest),
    /// Server → Client: a matched message
    Message(TapEnvelope),
    /// Server → Client: keep-alive ping
    Heartbeat,
    /// Server → Client: error message
    Error(String),
    /// Client → Server: replace the filter mid-session
    SetFilter(FilterSpec),
}

/// Serialized form of a filter expression: ordered (operator, condition)
/// clause pairs
///
/// An empty clause list matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    /// Clauses in declaration order
    pub clauses: Vec<(ClauseOp, String)>,
}

impl FilterSpec {
    /// A spec that matches everything
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Capture the clause list of an expression
    pub fn from_expression(filter: &FilterExpression) -> Self {
        Self {
            clauses: filter
                .clauses()
                .iter()
                .map(|c| (c.op(), c.expression().to_string()))
                .collect(),
        }
    }

    /// Build the filter expression this spec describes
    ///
    /// Unparseable clauses are carried along fail-closed; the caller logs
    /// them so the operator gets a diagnostic instead of a crash.
    pub fn to_expression(&self) -> FilterExpression {
        let mut filter = FilterExpression::new();
        for (op, expression) in &self.clauses {
            filter.push(*op, expression.clone());
        }
        filter
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.clauses.len() as u32);
        for (op, expression) in &self.clauses {
            buf.put_u8(op.to_u8());
            encode_string(expression, buf);
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 4 {
            return Err(TapError::Protocol("truncated filter spec".into()));
        }
        let count = buf.get_u32() as usize;
        let mut clauses = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            if buf.remaining() < 1 {
                return Err(TapError::Protocol("truncated filter clause".into()));
            }
            let op = ClauseOp::from_u8(buf.get_u8())
                .ok_or_else(|| TapError::Protocol("unknown clause operator".into()))?;
            let expression = decode_string(buf)?;
            clauses.push((op, expression));
        }
        Ok(Self { clauses })
    }
}

/// Subscription request from a client
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubscribeRequest {
    /// Filter clauses (empty = match all)
    pub filter: FilterSpec,
    /// Maximum messages per second (None = unlimited)
    pub max_messages_per_sec: Option<u32>,
}

impl SubscribeRequest {
    /// Create a match-all request
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Set a delivery rate limit
    pub fn with_rate_limit(mut self, messages_per_sec: u32) -> Self {
        self.max_messages_per_sec = Some(messages_per_sec);
        self
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.filter.encode(buf);
        match self.max_messages_per_sec {
            Some(rate) => {
                buf.put_u8(1);
                buf.put_u32(rate);
            }
            None => buf.put_u8(0),
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let filter = FilterSpec::decode(buf)?;
        let max_messages_per_sec = decode_option_u32(buf)?;
        Ok(Self {
            filter,
            max_messages_per_sec,
        })
    }
}

/// Message envelope sent to clients
///
/// Scalar metadata is pre-decoded; the payload and metadata maps travel as
/// JSON bytes for the client-side renderer to interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct TapEnvelope {
    /// Topic string
    pub topic: String,
    /// QoS level (0, 1, 2)
    pub qos: u8,
    /// Direction (0=incoming, 1=outgoing, 2=unknown)
    pub direction: u8,
    /// Observation time, epoch milliseconds
    pub timestamp_ms: i64,
    /// Payload as JSON bytes
    pub payload: Bytes,
    /// Metadata map as JSON bytes
    pub metadata: Bytes,
    /// Highlight color and optional reason, if the message was highlighted
    pub highlight: Option<(String, Option<String>)>,
}

impl TapEnvelope {
    /// Build an envelope from a dispatched tap item
    pub fn from_item(item: &TapItem) -> Self {
        let message = &item.message;
        Self {
            topic: message.topic().to_string(),
            qos: message.qos().to_u8(),
            direction: message.direction().to_u8(),
            timestamp_ms: message.timestamp().timestamp_millis(),
            payload: serde_json::to_vec(message.payload())
                .unwrap_or_default()
                .into(),
            metadata: serde_json::to_vec(message.metadata())
                .unwrap_or_default()
                .into(),
            highlight: item
                .highlight
                .as_ref()
                .map(|h| (h.color.as_str().to_string(), h.reason.clone())),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        encode_string(&self.topic, buf);
        buf.put_u8(self.qos);
        buf.put_u8(self.direction);
        buf.put_i64(self.timestamp_ms);
        encode_bytes(&self.payload, buf);
        encode_bytes(&self.metadata, buf);
        match &self.highlight {
            Some((color, reason)) => {
                buf.put_u8(1);
                encode_string(color, buf);
                encode_option_string(reason, buf);
            }
            None => buf.put_u8(0),
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let topic = decode_string(buf)?;

        if buf.remaining() < 10 {
            return Err(TapError::Protocol("truncated envelope".into()));
        }
        let qos = buf.get_u8();
        let direction = buf.get_u8();
        let timestamp_ms = buf.get_i64();

        let payload = decode_bytes(buf)?;
        let metadata = decode_bytes(buf)?;

        if buf.remaining() < 1 {
            return Err(TapError::Protocol("truncated envelope".into()));
        }
        let highlight = if buf.get_u8() == 1 {
            let color = decode_string(buf)?;
            let reason = decode_option_string(buf)?;
            Some((color, reason))
        } else {
            None
        };

        Ok(Self {
            topic,
            qos,
            direction,
            timestamp_ms,
            payload,
            metadata,
            highlight,
        })
    }
}

impl TapMessage {
    /// Encode a frame with its length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);

        // Reserve space for length prefix (filled in at end)
        buf.put_u32(0);

        match self {
            TapMessage::Subscribe(req) => {
                buf.put_u8(MSG_SUBSCRIBE);
                req.encode(&mut buf);
            }
            TapMessage::Message(envelope) => {
                buf.put_u8(MSG_MESSAGE);
                envelope.encode(&mut buf);
            }
            TapMessage::Heartbeat => {
                buf.put_u8(MSG_HEARTBEAT);
            }
            TapMessage::Error(msg) => {
                buf.put_u8(MSG_ERROR);
                encode_string(msg, &mut buf);
            }
            TapMessage::SetFilter(spec) => {
                buf.put_u8(MSG_SET_FILTER);
                spec.encode(&mut buf);
            }
        }

        // Write length prefix (excluding the 4-byte length field itself)
        let len = (buf.len() - 4) as u32;
        buf[0..4].copy_from_slice(&len.to_be_bytes());

        buf.freeze()
    }

    /// Decode a frame payload (after the length prefix has been consumed)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(TapError::Protocol("empty frame".into()));
        }

        let frame_type = buf.get_u8();

        match frame_type {
            MSG_SUBSCRIBE => Ok(TapMessage::Subscribe(SubscribeRequest::decode(&mut buf)?)),
            MSG_MESSAGE => Ok(TapMessage::Message(TapEnvelope::decode(&mut buf)?)),
            MSG_HEARTBEAT => Ok(TapMessage::Heartbeat),
            MSG_ERROR => Ok(TapMessage::Error(decode_string(&mut buf)?)),
            MSG_SET_FILTER => Ok(TapMessage::SetFilter(FilterSpec::decode(&mut buf)?)),
            _ => Err(TapError::Protocol(format!(
                "unknown frame type: {frame_type}"
            ))),
        }
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(TapError::Protocol("truncated string length".into()));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(TapError::Protocol("truncated string".into()));
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|e| TapError::Protocol(format!("invalid UTF-8: {e}")))
}

fn encode_option_string(opt: &Option<String>, buf: &mut BytesMut) {
    match opt {
        Some(s) => {
            buf.put_u8(1);
            encode_string(s, buf);
        }
        None => buf.put_u8(0),
    }
}

fn decode_option_string(buf: &mut Bytes) -> Result<Option<String>> {
    if buf.remaining() < 1 {
        return Err(TapError::Protocol("truncated option".into()));
    }
    if buf.get_u8() == 0 {
        return Ok(None);
    }
    Ok(Some(decode_string(buf)?))
}

fn encode_bytes(bytes: &Bytes, buf: &mut BytesMut) {
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_bytes(buf: &mut Bytes) -> Result<Bytes> {
    if buf.remaining() < 4 {
        return Err(TapError::Protocol("truncated bytes length".into()));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(TapError::Protocol("truncated bytes".into()));
    }
    Ok(buf.split_to(len))
}

fn decode_option_u32(buf: &mut Bytes) -> Result<Option<u32>> {
    if buf.remaining() < 1 {
        return Err(TapError::Protocol("truncated option".into()));
    }
    if buf.get_u8() == 0 {
        return Ok(None);
    }
    if buf.remaining() < 4 {
        return Err(TapError::Protocol("truncated u32".into()));
    }
    Ok(Some(buf.get_u32()))
}

/// Read a 4-byte big-endian length prefix
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
