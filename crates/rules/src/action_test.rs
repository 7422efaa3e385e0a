//! Tests for actions

use super::*;
use mqscope_protocol::MessageBuilder;

fn make_message(topic: &str) -> Arc<Message> {
    Arc::new(MessageBuilder::new(topic).finish())
}

// ============================================================================
// HighlightColor tests
// ============================================================================

#[test]
fn test_color_newtype() {
    let color = HighlightColor::new("red");
    assert_eq!(color.as_str(), "red");
    assert_eq!(color.to_string(), "red");
    assert_eq!(HighlightColor::from("red"), color);
}

// ============================================================================
// HighlightAction tests
// ============================================================================

#[test]
fn test_highlight_action_registers() {
    let registry = Arc::new(HighlightRegistry::new());
    let action = HighlightAction::new(Arc::clone(&registry), "red");
    let msg = make_message("a/b");

    action.execute(&HashMap::new(), &msg).unwrap();

    assert!(registry.is_highlighted(&msg));
    let info = registry.get(&msg).unwrap();
    assert_eq!(info.color.as_str(), "red");
    assert_eq!(info.reason, None);
}

#[test]
fn test_highlight_action_with_reason() {
    let registry = Arc::new(HighlightRegistry::new());
    let action =
        HighlightAction::new(Arc::clone(&registry), "yellow").with_reason("slow consumer");
    let msg = make_message("a/b");

    action.execute(&HashMap::new(), &msg).unwrap();

    let info = registry.get(&msg).unwrap();
    assert_eq!(info.color.as_str(), "yellow");
    assert_eq!(info.reason.as_deref(), Some("slow consumer"));
}

#[test]
fn test_highlight_action_is_idempotent() {
    let registry = Arc::new(HighlightRegistry::new());
    let action = HighlightAction::new(Arc::clone(&registry), "red");
    let msg = make_message("a/b");

    action.execute(&HashMap::new(), &msg).unwrap();
    action.execute(&HashMap::new(), &msg).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(&msg).unwrap().color.as_str(), "red");
}

#[test]
fn test_highlight_action_name() {
    let registry = Arc::new(HighlightRegistry::new());
    let action = HighlightAction::new(registry, "red");
    assert_eq!(action.name(), "highlight");
}
