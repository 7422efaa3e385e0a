//! Message - the unit of observed MQTT traffic
//!
//! A `Message` captures one wire-level packet as seen by the publish or
//! subscribe hook. The payload is kept as parsed JSON so that filters can
//! reach into nested fields without re-decoding per clause.
//!
//! # Design
//!
//! - Immutable once built; all construction goes through `MessageBuilder`
//! - Shared as `Arc<Message>` - fan-out to N tap clients is N pointer clones
//! - No `PartialEq`: equality is identity (the same observation), which is
//!   what the highlight table keys on

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// MQTT quality-of-service level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QosLevel {
    /// QoS 0 - fire and forget
    #[default]
    AtMostOnce,
    /// QoS 1 - acknowledged delivery
    AtLeastOnce,
    /// QoS 2 - assured delivery
    ExactlyOnce,
}

impl QosLevel {
    /// Convert from the wire-level QoS byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }

    /// Convert to the wire-level QoS byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

/// Direction of an observed message relative to the local endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Received from the broker
    Incoming,
    /// Published by the local client pool
    Outgoing,
    /// Direction could not be determined
    #[default]
    Unknown,
}

impl Direction {
    /// String form used by field extraction and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Unknown => "unknown",
        }
    }

    /// Convert to a wire byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Incoming => 0,
            Self::Outgoing => 1,
            Self::Unknown => 2,
        }
    }

    /// Convert from a wire byte (unknown values map to `Unknown`)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Incoming,
            1 => Self::Outgoing,
            _ => Self::Unknown,
        }
    }
}

/// One observed MQTT message
///
/// Lifetime is owned by the caller (typically a bounded history buffer);
/// the tap core never persists a message beyond processing it.
#[derive(Debug, Clone)]
pub struct Message {
    /// Full topic string as published
    topic: String,

    /// Parsed payload (commonly an object with a nested `message` field)
    payload: Value,

    /// Quality-of-service level
    qos: QosLevel,

    /// Incoming, outgoing, or unknown
    direction: Direction,

    /// When the packet was observed
    timestamp: DateTime<Utc>,

    /// Packet-level metadata: `retain`, `dup`, `message_id`, ...
    metadata: HashMap<String, Value>,
}

impl Message {
    /// Get the topic
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the payload
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Get the QoS level
    #[inline]
    pub fn qos(&self) -> QosLevel {
        self.qos
    }

    /// Get the direction
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Get the observation timestamp
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the metadata map
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Look up a single metadata key
    #[inline]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Builder for `Message`
///
/// # Example
///
/// ```
/// use mqscope_protocol::{MessageBuilder, QosLevel, Direction};
/// use serde_json::json;
///
/// let msg = MessageBuilder::new("sensors/room1/temp")
///     .payload(json!({"message": "21.5", "pool": "default"}))
///     .qos(QosLevel::AtLeastOnce)
///     .direction(Direction::Incoming)
///     .retain(false)
///     .finish();
///
/// assert_eq!(msg.topic(), "sensors/room1/temp");
/// assert_eq!(msg.qos(), QosLevel::AtLeastOnce);
/// ```
#[derive(Debug)]
pub struct MessageBuilder {
    topic: String,
    payload: Value,
    qos: QosLevel,
    direction: Direction,
    timestamp: Option<DateTime<Utc>>,
    metadata: HashMap<String, Value>,
}

impl MessageBuilder {
    /// Start building a message for the given topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: Value::Null,
            qos: QosLevel::AtMostOnce,
            direction: Direction::Unknown,
            timestamp: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the payload
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the QoS level
    pub fn qos(mut self, qos: QosLevel) -> Self {
        self.qos = qos;
        self
    }

    /// Set the direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set an explicit observation timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set an arbitrary metadata key
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the retain flag
    pub fn retain(self, retain: bool) -> Self {
        self.metadata("retain", Value::Bool(retain))
    }

    /// Set the dup flag
    pub fn dup(self, dup: bool) -> Self {
        self.metadata("dup", Value::Bool(dup))
    }

    /// Set the packet message id
    pub fn message_id(self, id: u16) -> Self {
        self.metadata("message_id", Value::from(id))
    }

    /// Finish building
    ///
    /// Stamps the current time if no explicit timestamp was set.
    pub fn finish(self) -> Message {
        Message {
            topic: self.topic,
            payload: self.payload,
            qos: self.qos,
            direction: self.direction,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
