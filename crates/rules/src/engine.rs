//! Rule engine - evaluating rules against the live message stream
//!
//! Rules are evaluated in registration order against every observed
//! message; matching rules execute their actions in order. Runtime
//! evaluation never errors and never propagates action failures - the
//! only loud path is rule construction, which rejects bad filters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use mqscope_filter::FilterExpression;
use mqscope_protocol::{FieldValue, Message};

use crate::action::Action;
use crate::error::{Result, RuleError};

/// Budget for a single action invocation
///
/// Actions are synchronous and cannot be preempted, so the budget is
/// enforced by measurement: overruns are logged per rule/action.
const ACTION_TIME_BUDGET: Duration = Duration::from_millis(25);

/// A named condition bound to an ordered list of actions
///
/// Immutable once registered; re-registering the same id replaces the
/// whole rule.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    condition: FilterExpression,
    actions: Vec<Arc<dyn Action>>,
    /// Field paths the condition references, precomputed at construction
    field_paths: Vec<String>,
}

impl Rule {
    /// Create a rule, validating the condition eagerly
    ///
    /// # Errors
    ///
    /// Rejects filters with syntax errors and empty action lists. This is
    /// the one place a bad filter is reported loudly instead of
    /// fail-closed - a persistent rule that can never match is a
    /// misconfiguration, not an operator toggling a live filter.
    pub fn new(
        id: impl Into<String>,
        condition: FilterExpression,
        actions: Vec<Arc<dyn Action>>,
    ) -> Result<Self> {
        let id = id.into();
        condition
            .validate()
            .map_err(|source| RuleError::InvalidFilter {
                id: id.clone(),
                source,
            })?;
        if actions.is_empty() {
            return Err(RuleError::NoActions { id });
        }

        let mut field_paths = Vec::new();
        for clause in condition.clauses() {
            if let Some(parsed) = clause.condition() {
                parsed.fields(&mut field_paths);
            }
        }

        Ok(Self {
            id,
            condition,
            actions,
            field_paths,
        })
    }

    /// The rule id
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The rule's filter condition
    #[inline]
    pub fn condition(&self) -> &FilterExpression {
        &self.condition
    }

    /// Extract the fields the condition references
    fn extract_fields(&self, message: &Message) -> HashMap<String, FieldValue> {
        let mut fields = HashMap::with_capacity(self.field_paths.len());
        for path in &self.field_paths {
            if let Some(value) = mqscope_filter::extract(message, path) {
                fields.insert(path.clone(), value);
            }
        }
        fields
    }
}

/// Registry of rules, evaluated in registration order
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: RwLock<Vec<Rule>>,
}

impl RuleEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule
    ///
    /// A rule with an already-registered id replaces the old rule in
    /// place, keeping its position in the evaluation order. New ids
    /// append.
    pub fn register(&self, rule: Rule) {
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }

    /// Remove a rule by id
    ///
    /// Returns whether a rule was removed.
    pub fn unregister(&self, id: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        rules.len() != before
    }

    /// Remove all rules
    pub fn clear(&self) {
        self.rules.write().clear();
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether the engine has no rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered rule ids, in evaluation order
    pub fn rule_ids(&self) -> Vec<String> {
        self.rules.read().iter().map(|r| r.id.clone()).collect()
    }

    /// Evaluate all rules against a message
    ///
    /// Runs on the hot publish/subscribe path: filter evaluation is pure,
    /// action failures are logged and never abort the remaining rules or
    /// actions, and every action invocation is timed against the budget.
    pub fn evaluate(&self, message: &Arc<Message>) {
        let rules = self.rules.read();
        for rule in rules.iter() {
            if !rule.condition.matches(message) {
                continue;
            }

            debug!(rule = %rule.id, topic = %message.topic(), "rule matched");
            let fields = rule.extract_fields(message);

            for action in &rule.actions {
                let started = Instant::now();
                if let Err(e) = action.execute(&fields, message) {
                    warn!(
                        rule = %rule.id,
                        action = action.name(),
                        error = %e,
                        "action failed"
                    );
                }
                let elapsed = started.elapsed();
                if elapsed > ACTION_TIME_BUDGET {
                    warn!(
                        rule = %rule.id,
                        action = action.name(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "action exceeded time budget"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
