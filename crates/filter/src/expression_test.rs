//! Tests for FilterExpression

use super::*;
use mqscope_protocol::{MessageBuilder, QosLevel};
use serde_json::json;

fn make_message(topic: &str, qos: QosLevel) -> Message {
    MessageBuilder::new(topic)
        .payload(json!({"pool": "sensors"}))
        .qos(qos)
        .finish()
}

// ============================================================================
// Empty expression tests
// ============================================================================

#[test]
fn test_empty_matches_everything() {
    let filter = FilterExpression::new();
    assert!(filter.is_empty());

    assert!(filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
    assert!(filter.matches(&make_message("x/y/z", QosLevel::ExactlyOnce)));
}

#[test]
fn test_default_is_empty() {
    assert!(FilterExpression::default().is_empty());
}

// ============================================================================
// Builder / clause invariant tests
// ============================================================================

#[test]
fn test_where_clause_is_base() {
    let filter = FilterExpression::where_clause("qos = 1");
    assert_eq!(filter.len(), 1);
    assert_eq!(filter.clauses()[0].op(), ClauseOp::Base);
    assert_eq!(filter.clauses()[0].expression(), "qos = 1");
}

#[test]
fn test_first_push_promotes_to_base() {
    let mut filter = FilterExpression::new();
    filter.push(ClauseOp::And, "qos = 1");
    assert_eq!(filter.clauses()[0].op(), ClauseOp::Base);
}

#[test]
fn test_clause_order_preserved() {
    let filter = FilterExpression::where_clause("qos = 1")
        .and("pool = 'sensors'")
        .or("qos = 2")
        .and_not("topic like 'test/#'");

    let ops: Vec<ClauseOp> = filter.clauses().iter().map(|c| c.op()).collect();
    assert_eq!(
        ops,
        vec![ClauseOp::Base, ClauseOp::And, ClauseOp::Or, ClauseOp::AndNot]
    );
}

// ============================================================================
// Fold composition tests
// ============================================================================

#[test]
fn test_and_composition() {
    let filter = FilterExpression::where_clause("topic like 'a/#'").and("qos = 1");

    assert!(filter.matches(&make_message("a/b", QosLevel::AtLeastOnce)));
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
    assert!(!filter.matches(&make_message("z/b", QosLevel::AtLeastOnce)));
}

#[test]
fn test_or_composition() {
    let filter = FilterExpression::where_clause("qos = 1").or("qos = 2");

    assert!(filter.matches(&make_message("a/b", QosLevel::AtLeastOnce)));
    assert!(filter.matches(&make_message("a/b", QosLevel::ExactlyOnce)));
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
}

#[test]
fn test_and_not_composition() {
    let filter = FilterExpression::where_clause("topic like 'a/#'").and_not("qos = 0");

    assert!(filter.matches(&make_message("a/b", QosLevel::AtLeastOnce)));
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
}

#[test]
fn test_fold_is_sequential() {
    // BASE false, OR true, AND NOT true => (false || true) && !true = false
    let filter = FilterExpression::where_clause("qos = 2")
        .or("pool = 'sensors'")
        .and_not("topic like 'a/#'");

    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
    assert!(filter.matches(&make_message("z/b", QosLevel::AtMostOnce)));
}

// ============================================================================
// Fail-closed tests
// ============================================================================

#[test]
fn test_unparseable_clause_evaluates_false() {
    let filter = FilterExpression::where_clause("not a condition at all");
    assert!(!filter.clauses()[0].is_valid());
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
}

#[test]
fn test_unparseable_and_clause_hides_traffic() {
    let filter = FilterExpression::where_clause("qos = 0").and("?? garbage ??");
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
}

#[test]
fn test_validate_reports_syntax_error() {
    let good = FilterExpression::where_clause("qos = 1").and("pool = 'x'");
    assert!(good.validate().is_ok());

    let bad = FilterExpression::where_clause("qos = 1").and("?? garbage ??");
    assert!(bad.validate().is_err());
}

// ============================================================================
// Structural operation tests
// ============================================================================

#[test]
fn test_clear() {
    let mut filter = FilterExpression::where_clause("qos = 1");
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));

    filter.clear();
    assert!(filter.is_empty());
    assert!(filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
}

#[test]
fn test_remove_reheads_list() {
    let mut filter = FilterExpression::where_clause("qos = 1").or("qos = 2");

    assert!(filter.remove("qos = 1"));
    assert_eq!(filter.len(), 1);
    assert_eq!(filter.clauses()[0].op(), ClauseOp::Base);
    assert_eq!(filter.clauses()[0].expression(), "qos = 2");

    assert!(filter.matches(&make_message("a/b", QosLevel::ExactlyOnce)));
    assert!(!filter.matches(&make_message("a/b", QosLevel::AtLeastOnce)));
}

#[test]
fn test_remove_missing_returns_false() {
    let mut filter = FilterExpression::where_clause("qos = 1");
    assert!(!filter.remove("qos = 9"));
    assert_eq!(filter.len(), 1);
}

// ============================================================================
// Clone independence tests
// ============================================================================

#[test]
fn test_clone_is_behaviorally_identical() {
    let filter = FilterExpression::where_clause("topic like 'a/#'").and("qos = 1");
    let cloned = filter.clone();

    for (topic, qos) in [
        ("a/b", QosLevel::AtLeastOnce),
        ("a/b", QosLevel::AtMostOnce),
        ("z/b", QosLevel::AtLeastOnce),
    ] {
        let msg = make_message(topic, qos);
        assert_eq!(filter.matches(&msg), cloned.matches(&msg));
    }
}

#[test]
fn test_clone_is_structurally_independent() {
    let original = FilterExpression::where_clause("qos = 1");
    let mut cloned = original.clone();

    cloned.clear();
    let msg = make_message("a/b", QosLevel::AtMostOnce);
    assert!(cloned.matches(&msg));
    assert!(!original.matches(&msg));
    assert_eq!(original.len(), 1);
}

// ============================================================================
// Display tests
// ============================================================================

#[test]
fn test_display() {
    let filter = FilterExpression::where_clause("qos = 1")
        .and("pool = 'x'")
        .and_not("topic like 't/#'");
    assert_eq!(
        filter.to_string(),
        "qos = 1 AND pool = 'x' AND NOT topic like 't/#'"
    );

    assert_eq!(FilterExpression::new().to_string(), "<match all>");
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn test_qos_sequence_scenario() {
    let filter = FilterExpression::where_clause("qos = 1");

    let sequence = [
        QosLevel::AtMostOnce,
        QosLevel::AtLeastOnce,
        QosLevel::ExactlyOnce,
        QosLevel::AtLeastOnce,
    ];
    let matched: Vec<bool> = sequence
        .iter()
        .map(|&qos| filter.matches(&make_message("a/b", qos)))
        .collect();

    assert_eq!(matched, vec![false, true, false, true]);
}

#[test]
fn test_topic_prefix_scenario() {
    let filter = FilterExpression::where_clause("topic like 'a/#'");

    assert!(filter.matches(&make_message("a/b", QosLevel::AtMostOnce)));
    assert!(filter.matches(&make_message("a/b/c", QosLevel::AtMostOnce)));
    assert!(!filter.matches(&make_message("b/a", QosLevel::AtMostOnce)));
}
