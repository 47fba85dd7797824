//! Expectation matching
//!
//! The engine never judges values itself. It hands the expected and the
//! observed value to a [`Matcher`]. [`StandardMatcher`] covers the common
//! cases and is what hosts get unless they inject their own.

use crate::types::Expectation;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Verdict of a matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Whether the observed value satisfied the expectation
    pub satisfied: bool,
    /// Human-readable explanation (empty when satisfied)
    pub detail: String,
}

/// Errors raised when an expectation itself is malformed.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Operator key is not recognized
    #[error("unknown matcher: {0}")]
    UnknownMatcher(String),

    /// Operator was given an operand of the wrong shape
    #[error("invalid operand for {matcher}: {message}")]
    InvalidOperand {
        /// Operator name
        matcher: String,
        /// What was wrong with the operand
        message: String,
    },

    /// Regex operand failed to compile
    #[error("invalid regex {pattern:?}: {source}")]
    Regex {
        /// Pattern as declared
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Predicate comparing an expectation to an observed value
pub trait Matcher: Send + Sync {
    /// Judge `observed` against `expected`
    fn matches(&self, expected: &Expectation, observed: &Value) -> Result<MatchOutcome, MatchError>;
}

/// Default matcher over JSON values
///
/// - Plain values compare by equality.
/// - An expected array requires every element to be present in an
///   observed array.
/// - A single-key object selects an operator: `not`, `equal`,
///   `contain-element`, `match-regex`, `have-prefix`, `have-suffix`,
///   `consist-of`, `have-len`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMatcher;

impl Matcher for StandardMatcher {
    fn matches(&self, expected: &Expectation, observed: &Value) -> Result<MatchOutcome, MatchError> {
        let satisfied = eval(expected.value(), observed)?;
        let detail = if satisfied {
            String::new()
        } else {
            format!("expected {observed} to match {}", expected.value())
        };
        Ok(MatchOutcome { satisfied, detail })
    }
}

fn eval(expected: &Value, observed: &Value) -> Result<bool, MatchError> {
    match expected {
        Value::Object(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (Some((op, operand)), None) => eval_operator(op, operand, observed),
                _ => Err(MatchError::InvalidOperand {
                    matcher: "object".to_string(),
                    message: format!("expected exactly one operator key, got {}", map.len()),
                }),
            }
        }
        Value::Array(wanted) => match observed {
            Value::Array(items) => contains_all(wanted, items),
            _ => Ok(false),
        },
        _ => Ok(expected == observed),
    }
}

fn eval_operator(op: &str, operand: &Value, observed: &Value) -> Result<bool, MatchError> {
    match op {
        "equal" => Ok(operand == observed),
        "not" => Ok(!eval(operand, observed)?),
        "contain-element" => match observed {
            Value::Array(items) => any_match(operand, items),
            _ => Ok(false),
        },
        "match-regex" => {
            let pattern = string_operand(op, operand)?;
            let re = Regex::new(pattern).map_err(|source| MatchError::Regex {
                pattern: pattern.to_string(),
                source,
            })?;
            Ok(any_str(observed, |s| re.is_match(s)))
        }
        "have-prefix" => {
            let prefix = string_operand(op, operand)?;
            Ok(any_str(observed, |s| s.starts_with(prefix)))
        }
        "have-suffix" => {
            let suffix = string_operand(op, operand)?;
            Ok(any_str(observed, |s| s.ends_with(suffix)))
        }
        "consist-of" => {
            let Value::Array(wanted) = operand else {
                return Err(invalid(op, "expected an array"));
            };
            match observed {
                Value::Array(items) => Ok(wanted.len() == items.len()
                    && contains_all(wanted, items)?
                    && items_covered(wanted, items)?),
                _ => Ok(false),
            }
        }
        "have-len" => {
            let len = operand
                .as_u64()
                .ok_or_else(|| invalid(op, "expected a non-negative integer"))?;
            let actual = match observed {
                Value::Array(items) => items.len(),
                Value::String(s) => s.chars().count(),
                _ => return Ok(false),
            };
            Ok(u64::try_from(actual).is_ok_and(|a| a == len))
        }
        other => Err(MatchError::UnknownMatcher(other.to_string())),
    }
}

fn contains_all(wanted: &[Value], items: &[Value]) -> Result<bool, MatchError> {
    for w in wanted {
        if !any_match(w, items)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn items_covered(wanted: &[Value], items: &[Value]) -> Result<bool, MatchError> {
    for item in items {
        let mut covered = false;
        for w in wanted {
            if eval(w, item)? {
                covered = true;
                break;
            }
        }
        if !covered {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(expected: &Value, items: &[Value]) -> Result<bool, MatchError> {
    for item in items {
        if eval(expected, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Apply a string predicate to a string or to any string element of an array
fn any_str(observed: &Value, pred: impl Fn(&str) -> bool) -> bool {
    match observed {
        Value::String(s) => pred(s.as_str()),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(pred),
        _ => false,
    }
}

fn string_operand<'a>(op: &str, operand: &'a Value) -> Result<&'a str, MatchError> {
    operand
        .as_str()
        .ok_or_else(|| invalid(op, "expected a string"))
}

fn invalid(op: &str, message: &str) -> MatchError {
    MatchError::InvalidOperand {
        matcher: op.to_string(),
        message: message.to_string(),
    }
}
