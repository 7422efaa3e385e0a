//! Tests for field extraction

use super::*;
use mqscope_protocol::{Direction, MessageBuilder, QosLevel};
use serde_json::json;

fn make_message() -> Message {
    MessageBuilder::new("sensors/room1/temp")
        .payload(json!({
            "message": "21.5",
            "pool": "sensors",
            "reading": {"value": 21.5, "unit": "C"},
            "tags": ["a", "b"],
            "spaced key": 7,
            "nothing": null,
        }))
        .qos(QosLevel::AtLeastOnce)
        .direction(Direction::Incoming)
        .retain(true)
        .message_id(42)
        .finish()
}

// ============================================================================
// Built-in field tests
// ============================================================================

#[test]
fn test_extract_topic() {
    let msg = make_message();
    assert_eq!(
        extract(&msg, "topic"),
        Some(FieldValue::Str("sensors/room1/temp".into()))
    );
}

#[test]
fn test_extract_qos() {
    let msg = make_message();
    assert_eq!(extract(&msg, "qos"), Some(FieldValue::Int(1)));
}

#[test]
fn test_extract_direction() {
    let msg = make_message();
    assert_eq!(
        extract(&msg, "direction"),
        Some(FieldValue::Str("incoming".into()))
    );
}

#[test]
fn test_extract_pool() {
    let msg = make_message();
    assert_eq!(extract(&msg, "pool"), Some(FieldValue::Str("sensors".into())));
}

#[test]
fn test_extract_pool_defaults() {
    let msg = MessageBuilder::new("a/b").payload(json!({})).finish();
    assert_eq!(extract(&msg, "pool"), Some(FieldValue::Str("default".into())));

    // Non-object payloads also fall back to the default pool
    let msg = MessageBuilder::new("a/b").finish();
    assert_eq!(extract(&msg, "pool"), Some(FieldValue::Str("default".into())));
}

// ============================================================================
// Payload path tests
// ============================================================================

#[test]
fn test_extract_payload_dotted() {
    let msg = make_message();
    assert_eq!(
        extract(&msg, "payload.message"),
        Some(FieldValue::Str("21.5".into()))
    );
    assert_eq!(
        extract(&msg, "payload.reading.value"),
        Some(FieldValue::Float(21.5))
    );
    assert_eq!(
        extract(&msg, "payload.reading.unit"),
        Some(FieldValue::Str("C".into()))
    );
}

#[test]
fn test_extract_payload_bracket() {
    let msg = make_message();
    assert_eq!(
        extract(&msg, "payload['spaced key']"),
        Some(FieldValue::Int(7))
    );
    assert_eq!(
        extract(&msg, "payload[\"message\"]"),
        Some(FieldValue::Str("21.5".into()))
    );
    assert_eq!(
        extract(&msg, "payload.tags[0]"),
        Some(FieldValue::Str("a".into()))
    );
    assert_eq!(
        extract(&msg, "payload.tags[1]"),
        Some(FieldValue::Str("b".into()))
    );
}

#[test]
fn test_extract_payload_absent() {
    let msg = make_message();
    assert_eq!(extract(&msg, "payload.missing"), None);
    assert_eq!(extract(&msg, "payload.reading.missing"), None);
    assert_eq!(extract(&msg, "payload.tags[9]"), None);
    // Indexing an object or keying an array is absent, not an error
    assert_eq!(extract(&msg, "payload.reading[0]"), None);
    assert_eq!(extract(&msg, "payload.tags.value"), None);
}

#[test]
fn test_extract_non_scalar_is_absent() {
    let msg = make_message();
    // Whole objects and arrays have no scalar form
    assert_eq!(extract(&msg, "payload.reading"), None);
    assert_eq!(extract(&msg, "payload.tags"), None);
    // JSON null reads as absent
    assert_eq!(extract(&msg, "payload.nothing"), None);
    // Object payload at the root too
    assert_eq!(extract(&msg, "payload"), None);
}

#[test]
fn test_extract_malformed_path_is_absent() {
    let msg = make_message();
    assert_eq!(extract(&msg, "payload."), None);
    assert_eq!(extract(&msg, "payload..message"), None);
    assert_eq!(extract(&msg, "payload.tags[x]"), None);
    assert_eq!(extract(&msg, "payload.tags[0"), None);
    assert_eq!(extract(&msg, "payload['open"), None);
}

// ============================================================================
// Metadata and fall-through tests
// ============================================================================

#[test]
fn test_extract_metadata() {
    let msg = make_message();
    assert_eq!(extract(&msg, "retain"), Some(FieldValue::Bool(true)));
    assert_eq!(extract(&msg, "message_id"), Some(FieldValue::Int(42)));
    assert_eq!(extract(&msg, "dup"), None);
}

#[test]
fn test_extract_bare_name_falls_through_to_payload() {
    let msg = make_message();
    assert_eq!(
        extract(&msg, "message"),
        Some(FieldValue::Str("21.5".into()))
    );
    assert_eq!(
        extract(&msg, "reading.value"),
        Some(FieldValue::Float(21.5))
    );
}

#[test]
fn test_extract_unknown_field_is_absent() {
    let msg = make_message();
    assert_eq!(extract(&msg, "no_such_field"), None);
    assert_eq!(extract(&msg, ""), None);
}
