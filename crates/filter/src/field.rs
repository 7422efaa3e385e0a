//! Field extraction - resolving a field reference against a message
//!
//! Maps a dotted/bracket field path (`topic`, `qos`, `payload.message`,
//! `payload.items[0]`, metadata keys) to a scalar `FieldValue`, or `None`
//! when the field is absent. Absence is a distinct outcome, not an error -
//! the comparison layer gives it documented semantics.
//!
//! # Resolution Order
//!
//! 1. Built-ins: `topic`, `qos`, `direction`, `pool`
//! 2. `payload`-prefixed paths into the JSON payload
//! 3. Metadata keys (`retain`, `dup`, `message_id`, ...)
//! 4. Bare names fall through to the payload object

use mqscope_protocol::{FieldValue, Message};
use serde_json::Value;

/// Resolve a field path against a message
///
/// Returns `None` for absent fields, malformed paths, and non-scalar
/// results (JSON null, arrays, objects) - all fail-closed.
pub fn extract(message: &Message, path: &str) -> Option<FieldValue> {
    match path {
        "topic" => return Some(FieldValue::Str(message.topic().to_string())),
        "qos" => return Some(FieldValue::Int(i64::from(message.qos().to_u8()))),
        "direction" => {
            return Some(FieldValue::Str(message.direction().as_str().to_string()));
        }
        "pool" => {
            // The client pool name lives in the payload; "default" if unset
            return Some(
                message
                    .payload()
                    .get("pool")
                    .and_then(FieldValue::from_json)
                    .unwrap_or_else(|| FieldValue::Str("default".to_string())),
            );
        }
        _ => {}
    }

    if path == "payload" {
        return FieldValue::from_json(message.payload());
    }

    if let Some(rest) = path.strip_prefix("payload.") {
        return navigate(message.payload(), rest);
    }
    if path.starts_with("payload[") {
        return navigate(message.payload(), &path["payload".len()..]);
    }

    if let Some(value) = message.metadata_value(path) {
        return FieldValue::from_json(value);
    }

    navigate(message.payload(), path)
}

/// One step of a parsed field path
#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Navigate a JSON value by a dotted/bracket path
fn navigate(root: &Value, path: &str) -> Option<FieldValue> {
    let segments = parse_path(path)?;
    let mut current = root;
    for segment in &segments {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(key)?,
            Segment::Index(i) => current.as_array()?.get(*i)?,
        };
    }
    FieldValue::from_json(current)
}

/// Parse `a.b['c d'][0].e` into segments
///
/// Returns `None` on malformed paths (unterminated brackets/quotes, empty
/// keys) so a typo in a filter reads as an absent field.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut key = String::new();
    let mut expect_more = true;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() {
                    return None;
                }
                segments.push(Segment::Key(std::mem::take(&mut key)));
                expect_more = true;
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                segments.push(parse_bracket(&mut chars)?);
                // A '.' directly after ']' separates the next key
                if chars.peek() == Some(&'.') {
                    chars.next();
                    expect_more = true;
                } else {
                    expect_more = false;
                }
            }
            c => {
                key.push(c);
                expect_more = false;
            }
        }
    }

    if !key.is_empty() {
        segments.push(Segment::Key(key));
    } else if expect_more {
        // Empty path or trailing '.'
        return None;
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Parse one bracket expression after the opening `[`
fn parse_bracket(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<Segment> {
    match chars.peek().copied() {
        Some(q) if q == '\'' || q == '"' => {
            chars.next();
            let mut quoted = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => quoted.push(c),
                    None => return None,
                }
            }
            if chars.next() != Some(']') {
                return None;
            }
            Some(Segment::Key(quoted))
        }
        _ => {
            let mut digits = String::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(c) if c.is_ascii_digit() => digits.push(c),
                    _ => return None,
                }
            }
            Some(Segment::Index(digits.parse().ok()?))
        }
    }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod tests;
