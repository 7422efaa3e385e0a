//! Condition parsing and evaluation
//!
//! A condition is one clause of a filter expression, e.g.
//! `topic like 'sensors/#'` or `(qos = 1 or qos = 2) and pool != 'test'`.
//!
//! # Grammar
//!
//! ```text
//! condition  := term ((AND | OR) term)*      -- left-to-right fold, no precedence
//! term       := '(' condition ')'
//!             | field [NOT] LIKE literal
//!             | field op literal             -- op in = != <> > < >= <=
//! ```
//!
//! Tokenization splits on whitespace with a parenthesis-depth counter and
//! single-quote awareness: a parenthesized group becomes one token, a
//! quoted literal may contain spaces and parens. Keywords are
//! case-insensitive; operators must be whitespace-separated.
//!
//! Evaluation is pure and never errors. The absent-field rules are:
//! `=` against absent is false, `!=`/`NOT LIKE` against absent are true,
//! ordering against a numeric literal coerces absent to 0.

use mqscope_protocol::{FieldValue, Message};

use crate::error::{FilterError, Result};
use crate::field::extract;
use crate::like::like_matches;
use crate::topic::topic_matches;

/// Comparison operator in a simple condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl CompareOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }
}

/// Boolean connective between terms at the same nesting depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// Parsed condition AST
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field [NOT] LIKE pattern` - `topic` delegates to MQTT wildcard
    /// semantics, every other field uses SQL LIKE
    Like {
        /// Field path
        field: String,
        /// Raw pattern (quotes stripped)
        pattern: String,
        /// NOT LIKE form
        negated: bool,
    },
    /// `field op literal`
    Compare {
        /// Field path
        field: String,
        /// Comparison operator
        op: CompareOp,
        /// Literal to compare against
        literal: FieldValue,
    },
    /// Terms joined by AND/OR, evaluated as a strict left fold
    ///
    /// The first entry's connective is ignored (it seeds the fold).
    Group(Vec<(BoolOp, Condition)>),
}

impl Condition {
    /// Evaluate against a message - pure, never errors
    pub fn eval(&self, message: &Message) -> bool {
        match self {
            Self::Like {
                field,
                pattern,
                negated,
            } => {
                let matched = match extract(message, field) {
                    // Absent fields never LIKE-match, so NOT LIKE is
                    // satisfied by absence
                    None => false,
                    Some(value) => {
                        if field == "topic" {
                            topic_matches(pattern, &value.as_text())
                        } else {
                            like_matches(pattern, &value.as_text())
                        }
                    }
                };
                matched != *negated
            }
            Self::Compare { field, op, literal } => {
                compare(extract(message, field).as_ref(), *op, literal)
            }
            Self::Group(terms) => {
                let mut result = terms
                    .first()
                    .map(|(_, term)| term.eval(message))
                    .unwrap_or(false);
                for (connective, term) in terms.iter().skip(1) {
                    result = match connective {
                        BoolOp::And => result && term.eval(message),
                        BoolOp::Or => result || term.eval(message),
                    };
                }
                result
            }
        }
    }

    /// Collect the field paths this condition references
    pub fn fields(&self, out: &mut Vec<String>) {
        match self {
            Self::Like { field, .. } | Self::Compare { field, .. } => {
                if !out.contains(field) {
                    out.push(field.clone());
                }
            }
            Self::Group(terms) => {
                for (_, term) in terms {
                    term.fields(out);
                }
            }
        }
    }
}

/// Apply a comparison with the documented absent-field semantics
fn compare(value: Option<&FieldValue>, op: CompareOp, literal: &FieldValue) -> bool {
    match literal {
        FieldValue::Bool(expected) => match op {
            // Truthiness coercion; only equality forms are meaningful
            CompareOp::Eq => value.is_some_and(|v| v.is_truthy() == *expected),
            CompareOp::Ne => value.is_none_or(|v| v.is_truthy() != *expected),
            _ => false,
        },
        FieldValue::Int(_) | FieldValue::Float(_) => {
            let lit = literal.as_f64().unwrap_or(0.0);
            match op {
                CompareOp::Eq => value.is_some_and(|v| match v.as_f64() {
                    Some(n) => n == lit,
                    None => v.as_text() == literal.as_text(),
                }),
                CompareOp::Ne => value.is_none_or(|v| match v.as_f64() {
                    Some(n) => n != lit,
                    None => v.as_text() != literal.as_text(),
                }),
                // Ordering: absent coerces to 0, non-numeric values fail closed
                _ => {
                    let n = match value {
                        None => 0.0,
                        Some(v) => match v.as_f64() {
                            Some(n) => n,
                            None => return false,
                        },
                    };
                    match op {
                        CompareOp::Gt => n > lit,
                        CompareOp::Ge => n >= lit,
                        CompareOp::Lt => n < lit,
                        _ => n <= lit,
                    }
                }
            }
        }
        FieldValue::Str(expected) => match op {
            CompareOp::Eq => value.is_some_and(|v| v.as_text() == *expected),
            CompareOp::Ne => value.is_none_or(|v| v.as_text() != *expected),
            // String ordering is not part of the grammar - fail closed
            _ => false,
        },
    }
}

/// Parse a condition string into an AST
///
/// # Errors
///
/// Returns `FilterError::Syntax` for unbalanced parentheses, unterminated
/// quotes, and condition shapes outside the grammar.
pub fn parse_condition(input: &str) -> Result<Condition> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FilterError::syntax(input, "empty condition"));
    }
    parse_tokens(&tokens, input)
}

fn parse_tokens(tokens: &[String], input: &str) -> Result<Condition> {
    // Split into terms on top-level AND/OR keywords
    let mut terms: Vec<(BoolOp, Vec<&String>)> = Vec::new();
    let mut current: Vec<&String> = Vec::new();
    let mut pending = BoolOp::And;

    for token in tokens {
        let lowered = token.to_ascii_lowercase();
        if lowered == "and" || lowered == "or" {
            if current.is_empty() {
                return Err(FilterError::syntax(input, "dangling AND/OR"));
            }
            terms.push((pending, std::mem::take(&mut current)));
            pending = if lowered == "and" {
                BoolOp::And
            } else {
                BoolOp::Or
            };
        } else {
            current.push(token);
        }
    }
    if current.is_empty() {
        return Err(FilterError::syntax(input, "dangling AND/OR"));
    }
    terms.push((pending, current));

    if terms.len() == 1 {
        let (_, tokens) = &terms[0];
        return parse_term(tokens, input);
    }

    let mut parsed = Vec::with_capacity(terms.len());
    for (connective, term_tokens) in &terms {
        parsed.push((*connective, parse_term(term_tokens, input)?));
    }
    Ok(Condition::Group(parsed))
}

/// Parse one term: a parenthesized group or a simple condition
fn parse_term(tokens: &[&String], input: &str) -> Result<Condition> {
    if tokens.len() == 1 && tokens[0].starts_with('(') && tokens[0].ends_with(')') {
        let inner = &tokens[0][1..tokens[0].len() - 1];
        return parse_condition(inner);
    }

    match tokens {
        [field, op_token, value] => {
            if op_token.eq_ignore_ascii_case("like") {
                return Ok(Condition::Like {
                    field: (*field).clone(),
                    pattern: parse_literal(value).as_text(),
                    negated: false,
                });
            }
            let op = CompareOp::from_token(op_token)
                .ok_or_else(|| FilterError::syntax(input, format!("unknown operator '{op_token}'")))?;
            Ok(Condition::Compare {
                field: (*field).clone(),
                op,
                literal: parse_literal(value),
            })
        }
        [field, not_token, like_token, value]
            if not_token.eq_ignore_ascii_case("not")
                && like_token.eq_ignore_ascii_case("like") =>
        {
            Ok(Condition::Like {
                field: (*field).clone(),
                pattern: parse_literal(value).as_text(),
                negated: true,
            })
        }
        _ => Err(FilterError::syntax(
            input,
            "expected 'field op value' or 'field [NOT] LIKE pattern'",
        )),
    }
}

/// Parse a literal token
///
/// Single-quoted strings keep their exact content; unquoted tokens try
/// integer, float, and boolean before falling back to a bare string.
fn parse_literal(token: &str) -> FieldValue {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return FieldValue::Str(token[1..token.len() - 1].to_string());
    }
    if let Ok(i) = token.parse::<i64>() {
        return FieldValue::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return FieldValue::Float(f);
    }
    if token.eq_ignore_ascii_case("true") {
        return FieldValue::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return FieldValue::Bool(false);
    }
    FieldValue::Str(token.to_string())
}

/// Split a condition string into tokens
///
/// Whitespace separates tokens at parenthesis depth zero outside quotes;
/// a parenthesized group or quoted literal becomes a single token.
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in input.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quote => {
                if depth == 0 {
                    return Err(FilterError::syntax(input, "unbalanced ')'"));
                }
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 && !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quote {
        return Err(FilterError::syntax(input, "unterminated quote"));
    }
    if depth != 0 {
        return Err(FilterError::syntax(input, "unbalanced '('"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
#[path = "condition_test.rs"]
mod tests;
