//! Conditional logic: declarative boolean gates over other field values.
//!
//! ```json
//! { "$some": [
//!     { "kind": "external", "../visible": true },
//!     { "/priority": { "gte": 3 }, "title": { "regexp": "^Draft" } }
//! ] }
//! ```
//!
//! Keys of a condition map are references resolved against the path of the
//! field that carries the logic, see [`FieldPath::resolve`].

use std::cmp::Ordering;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::errors::LogicError;
use super::path::FieldPath;
use super::value::strict_eq;

const OPERATORS: [&str; 7] = ["eq", "ne", "gt", "gte", "lt", "lte", "regexp"];

/// A tree of conditions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum ConditionalLogic {
    /// `$every`: all branches must match.
    All(Vec<ConditionalLogic>),
    /// `$some`: at least one branch must match.
    Any(Vec<ConditionalLogic>),
    /// Every reference must satisfy its condition.
    Conditions(IndexMap<String, Condition>),
}

/// Test applied to one referenced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Rule(Rule),
    /// Exact type-and-value equality.
    Literal(Value),
}

/// Operator rule. Every operator present must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub eq: Option<Value>,
    pub ne: Option<Value>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    pub regexp: Option<String>,
}

impl TryFrom<Value> for ConditionalLogic {
    type Error = LogicError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(LogicError::Malformed(format!("expected an object, got {value}")));
        };

        if map.len() == 1 {
            if let Some(branches) = map.get("$every") {
                return Ok(Self::All(parse_branches("$every", branches)?));
            }
            if let Some(branches) = map.get("$some") {
                return Ok(Self::Any(parse_branches("$some", branches)?));
            }
        }

        let mut conditions = IndexMap::new();
        for (reference, test) in map {
            if reference.starts_with('$') {
                return Err(LogicError::Malformed(format!("unexpected combinator '{reference}'")));
            }
            conditions.insert(reference, Condition::from_value(test)?);
        }
        Ok(Self::Conditions(conditions))
    }
}

fn parse_branches(key: &str, branches: &Value) -> Result<Vec<ConditionalLogic>, LogicError> {
    let Value::Array(items) = branches else {
        return Err(LogicError::Malformed(format!("'{key}' expects an array")));
    };
    items.iter().cloned().map(ConditionalLogic::try_from).collect()
}

impl Condition {
    fn from_value(value: Value) -> Result<Self, LogicError> {
        match value {
            Value::Object(map)
                if !map.is_empty() && map.keys().all(|k| OPERATORS.contains(&k.as_str())) =>
            {
                let mut rule = Rule::default();
                for (op, operand) in map {
                    match op.as_str() {
                        "eq" => rule.eq = Some(operand),
                        "ne" => rule.ne = Some(operand),
                        "gt" => rule.gt = Some(operand),
                        "gte" => rule.gte = Some(operand),
                        "lt" => rule.lt = Some(operand),
                        "lte" => rule.lte = Some(operand),
                        _ => match operand {
                            Value::String(pattern) => rule.regexp = Some(pattern),
                            other => {
                                return Err(LogicError::Malformed(format!(
                                    "'regexp' expects a string, got {other}"
                                )));
                            }
                        },
                    }
                }
                Ok(Self::Rule(rule))
            }
            literal => Ok(Self::Literal(literal)),
        }
    }

    pub fn test(&self, value: &Value) -> bool {
        match self {
            Self::Literal(expected) => strict_eq(value, expected),
            Self::Rule(rule) => rule.test(value),
        }
    }
}

impl Rule {
    pub fn test(&self, value: &Value) -> bool {
        let relational = |operand: &Option<Value>, accept: fn(Ordering) -> bool| {
            operand.as_ref().is_none_or(|r| compare(value, r).is_some_and(accept))
        };

        self.eq.as_ref().is_none_or(|r| strict_eq(value, r))
            && self.ne.as_ref().is_none_or(|r| !strict_eq(value, r))
            && relational(&self.gt, Ordering::is_gt)
            && relational(&self.gte, Ordering::is_ge)
            && relational(&self.lt, Ordering::is_lt)
            && relational(&self.lte, Ordering::is_le)
            && self.regexp.as_deref().is_none_or(|pattern| regexp_search(value, pattern))
    }
}

/// Order two operands of the same primitive type. Arrays on the left are
/// compared by length. Anything else is incomparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let left = match left {
        Value::Array(items) => Value::from(items.len()),
        other => other.clone(),
    };
    match (&left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn regexp_search(value: &Value, pattern: &str) -> bool {
    match (value, Regex::new(pattern)) {
        (Value::String(s), Ok(re)) => re.is_match(s),
        _ => false,
    }
}

/// Evaluate `logic` for the field at `field_path` inside `record`.
///
/// A reference that resolves to a missing value is a schema defect and is
/// raised as [`LogicError::MissingDependency`].
pub fn matches(
    record: &Value,
    field_path: &FieldPath,
    logic: &ConditionalLogic,
) -> Result<bool, LogicError> {
    match logic {
        ConditionalLogic::All(branches) => {
            for branch in branches {
                if !matches(record, field_path, branch)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionalLogic::Any(branches) => {
            for branch in branches {
                if matches(record, field_path, branch)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ConditionalLogic::Conditions(conditions) => {
            for (reference, condition) in conditions {
                let resolved = field_path.resolve(reference);
                let value = resolved.lookup(record).ok_or_else(|| LogicError::MissingDependency {
                    field: field_path.to_string(),
                    reference: reference.clone(),
                    resolved: resolved.to_string(),
                })?;
                if !condition.test(value) {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}
