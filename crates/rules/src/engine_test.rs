//! Tests for the rule engine

use super::*;
use parking_lot::Mutex;

use crate::action::{HighlightAction, HighlightInfo};
use crate::error::ActionError;
use crate::highlight::HighlightRegistry;
use mqscope_protocol::{MessageBuilder, QosLevel};
use serde_json::json;

fn make_message(topic: &str, qos: QosLevel) -> Arc<Message> {
    Arc::new(
        MessageBuilder::new(topic)
            .payload(json!({"message": "hello", "pool": "sensors"}))
            .qos(qos)
            .finish(),
    )
}

/// Action that records its invocations for order assertions
#[derive(Debug)]
struct RecordingAction {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingAction {
    fn new(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            log,
            fail: false,
        })
    }

    fn failing(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            log,
            fail: true,
        })
    }
}

impl Action for RecordingAction {
    fn name(&self) -> &'static str {
        self.label
    }

    fn execute(
        &self,
        fields: &HashMap<String, FieldValue>,
        message: &Arc<Message>,
    ) -> std::result::Result<(), ActionError> {
        self.log
            .lock()
            .push(format!("{}:{}:{}", self.label, message.topic(), fields.len()));
        if self.fail {
            return Err(ActionError::failed("intentional"));
        }
        Ok(())
    }
}

// ============================================================================
// Rule construction tests
// ============================================================================

#[test]
fn test_rule_new_validates_filter() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = RecordingAction::new("a", log);

    let ok = Rule::new(
        "good",
        FilterExpression::where_clause("qos = 1"),
        vec![action.clone()],
    );
    assert!(ok.is_ok());

    let bad = Rule::new(
        "bad",
        FilterExpression::where_clause("?? garbage ??"),
        vec![action],
    );
    assert!(matches!(bad, Err(RuleError::InvalidFilter { .. })));
}

#[test]
fn test_rule_new_rejects_empty_actions() {
    let result = Rule::new("empty", FilterExpression::new(), vec![]);
    assert!(matches!(result, Err(RuleError::NoActions { .. })));
}

// ============================================================================
// Registration tests
// ============================================================================

#[test]
fn test_register_and_unregister() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let action = RecordingAction::new("a", log);
    let engine = RuleEngine::new();

    engine.register(
        Rule::new("r1", FilterExpression::new(), vec![action.clone()]).unwrap(),
    );
    engine.register(Rule::new("r2", FilterExpression::new(), vec![action]).unwrap());
    assert_eq!(engine.len(), 2);
    assert_eq!(engine.rule_ids(), vec!["r1", "r2"]);

    assert!(engine.unregister("r1"));
    assert_eq!(engine.rule_ids(), vec!["r2"]);
    assert!(!engine.unregister("r1"));
}

#[test]
fn test_register_same_id_replaces_in_place() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "r1",
            FilterExpression::where_clause("qos = 0"),
            vec![RecordingAction::new("first", log.clone())],
        )
        .unwrap(),
    );
    engine.register(
        Rule::new(
            "r2",
            FilterExpression::new(),
            vec![RecordingAction::new("other", log.clone())],
        )
        .unwrap(),
    );

    // Replacement keeps the original evaluation position
    engine.register(
        Rule::new(
            "r1",
            FilterExpression::where_clause("qos = 0"),
            vec![RecordingAction::new("second", log.clone())],
        )
        .unwrap(),
    );
    assert_eq!(engine.rule_ids(), vec!["r1", "r2"]);

    engine.evaluate(&make_message("a/b", QosLevel::AtMostOnce));
    let entries = log.lock().clone();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].starts_with("second:"));
    assert!(entries[1].starts_with("other:"));
}

// ============================================================================
// Evaluation tests
// ============================================================================

#[test]
fn test_evaluate_runs_matching_rules_only() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "qos1",
            FilterExpression::where_clause("qos = 1"),
            vec![RecordingAction::new("qos1", log.clone())],
        )
        .unwrap(),
    );
    engine.register(
        Rule::new(
            "sensors",
            FilterExpression::where_clause("topic like 'sensors/#'"),
            vec![RecordingAction::new("sensors", log.clone())],
        )
        .unwrap(),
    );

    engine.evaluate(&make_message("sensors/a", QosLevel::AtMostOnce));
    assert_eq!(log.lock().len(), 1);
    assert!(log.lock()[0].starts_with("sensors:"));

    log.lock().clear();
    engine.evaluate(&make_message("other/a", QosLevel::AtLeastOnce));
    assert_eq!(log.lock().len(), 1);
    assert!(log.lock()[0].starts_with("qos1:"));
}

#[test]
fn test_registration_order_is_execution_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    for label in ["first", "second", "third"] {
        engine.register(
            Rule::new(
                label,
                FilterExpression::new(),
                vec![RecordingAction::new(label, log.clone())],
            )
            .unwrap(),
        );
    }

    engine.evaluate(&make_message("a/b", QosLevel::AtMostOnce));

    let labels: Vec<String> = log
        .lock()
        .iter()
        .map(|e| e.split(':').next().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["first", "second", "third"]);
}

#[test]
fn test_actions_execute_in_order_within_rule() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "multi",
            FilterExpression::new(),
            vec![
                RecordingAction::new("a1", log.clone()),
                RecordingAction::new("a2", log.clone()),
            ],
        )
        .unwrap(),
    );

    engine.evaluate(&make_message("a/b", QosLevel::AtMostOnce));

    let entries = log.lock().clone();
    assert!(entries[0].starts_with("a1:"));
    assert!(entries[1].starts_with("a2:"));
}

#[test]
fn test_action_failure_does_not_abort_remaining() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "r1",
            FilterExpression::new(),
            vec![
                RecordingAction::failing("boom", log.clone()),
                RecordingAction::new("after", log.clone()),
            ],
        )
        .unwrap(),
    );
    engine.register(
        Rule::new(
            "r2",
            FilterExpression::new(),
            vec![RecordingAction::new("next_rule", log.clone())],
        )
        .unwrap(),
    );

    engine.evaluate(&make_message("a/b", QosLevel::AtMostOnce));

    let entries = log.lock().clone();
    assert_eq!(entries.len(), 3);
    assert!(entries[1].starts_with("after:"));
    assert!(entries[2].starts_with("next_rule:"));
}

#[test]
fn test_extracted_fields_passed_to_actions() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "r",
            FilterExpression::where_clause("topic like 'sensors/#' and qos = 0"),
            vec![RecordingAction::new("a", log.clone())],
        )
        .unwrap(),
    );

    engine.evaluate(&make_message("sensors/a", QosLevel::AtMostOnce));

    // Both referenced fields (topic, qos) were extracted
    assert_eq!(log.lock()[0], "a:sensors/a:2");
}

// ============================================================================
// Highlight integration tests
// ============================================================================

#[test]
fn test_highlight_rule_end_to_end() {
    let registry = Arc::new(HighlightRegistry::new());
    let engine = RuleEngine::new();

    engine.register(
        Rule::new(
            "highlight-qos1",
            FilterExpression::where_clause("qos = 1"),
            vec![Arc::new(
                HighlightAction::new(Arc::clone(&registry), "red").with_reason("qos 1 traffic"),
            )],
        )
        .unwrap(),
    );

    let hit = make_message("a/b", QosLevel::AtLeastOnce);
    let miss = make_message("a/b", QosLevel::AtMostOnce);
    engine.evaluate(&hit);
    engine.evaluate(&miss);

    assert!(registry.is_highlighted(&hit));
    assert!(!registry.is_highlighted(&miss));
    assert_eq!(
        registry.get(&hit),
        Some(HighlightInfo::new("red", Some("qos 1 traffic".into())))
    );
}
