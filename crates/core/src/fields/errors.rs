//! Error types for field definitions, processing and population.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use super::path::FieldPath;
use crate::query::QueryError;

pub const REQUIRED: &str = "This field is required";
pub const INVALID_INPUT_TYPE: &str = "Invalid input type";
pub const UNRECOGNIZED_FIELD: &str = "Unrecognized field name";
pub const INVALID_BLOCK_NAME: &str = "Invalid block name";
pub const INVALID_STRUCTURE_KEY: &str = "Invalid structure key";
pub const BLOCK_NOT_ALLOWED: &str = "This block is not allowed here";
pub const NOT_UNIQUE: &str = "This value already exists";
pub const IMMUTABLE: &str = "This field is immutable";

/// Problems with a schema or a declaration's shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No definition is registered for a field type.
    #[error("unknown field type: {0}")]
    UnknownKind(String),

    /// A required option was not supplied.
    #[error("missing required option '{option}' for {kind} field '{field}'")]
    MissingOption {
        kind: String,
        field: String,
        option: String,
    },

    /// A supplied option is not declared by the field type.
    #[error("unknown option '{option}' for {kind} field '{field}'")]
    UnknownOption {
        kind: String,
        field: String,
        option: String,
    },

    /// A supplied option has the wrong type.
    #[error("invalid value for option '{option}' of {kind} field '{field}': expected {expected}")]
    InvalidOption {
        kind: String,
        field: String,
        option: String,
        expected: String,
    },

    /// Collection not found in the schema registry.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Block not found in the schema registry.
    #[error("unknown block: {0}")]
    UnknownBlock(String),
}

/// Errors raised by the conditional logic evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    /// A conditional reference points at a value that does not exist.
    #[error(
        "conditional logic of '{field}' references '{reference}', which resolves to the missing value '{resolved}'"
    )]
    MissingDependency {
        field: String,
        reference: String,
        resolved: String,
    },

    /// The logic tree does not have a recognized shape.
    #[error("malformed conditional logic: {0}")]
    Malformed(String),
}

/// Failure reported by a sanitizer, validator or populator.
#[derive(Debug, Error)]
pub enum FieldError {
    /// User-facing message, recorded verbatim in the error map.
    #[error("{0}")]
    Message(String),

    /// The query capability failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Nested schema problem discovered while handling a value.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Nested engine defect surfaced while populating related records.
    #[error(transparent)]
    Engine(#[from] Box<EngineError>),
}

impl FieldError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Defects that abort an engine operation.
///
/// User-facing validation failures never appear here; they are collected in
/// an [`ErrorMap`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Flat mapping from a fully-qualified field path to a message.
///
/// A non-empty map signals a failed operation. The first message recorded
/// for a path wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(IndexMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message at `path` unless one is already present.
    pub fn insert(&mut self, path: &FieldPath, message: impl Into<String>) {
        self.0.entry(path.to_string()).or_insert_with(|| message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another map, prefixing each of its paths.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ErrorMap) {
        for (path, message) in other.0 {
            let key = if path.is_empty() { prefix.to_string() } else { format!("{prefix}.{path}") };
            self.0.entry(key).or_insert(message);
        }
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.0
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, message)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{path}: {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = ErrorMap::new();
        let path = FieldPath::parse("items.0.title");
        errors.insert(&path, "first");
        errors.insert(&path, "second");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("items.0.title"), Some("first"));
    }

    #[test]
    fn test_merge_prefixed() {
        let mut inner = ErrorMap::new();
        inner.insert(&FieldPath::parse("title"), REQUIRED);
        let mut outer = ErrorMap::new();
        outer.merge_prefixed("2", inner);
        assert_eq!(outer.get("2.title"), Some(REQUIRED));
    }

    #[test]
    fn test_display() {
        let mut errors = ErrorMap::new();
        errors.insert(&FieldPath::parse("a"), "x");
        errors.insert(&FieldPath::parse("b.0"), "y");
        assert_eq!(errors.to_string(), "a: x\nb.0: y");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::MissingOption {
            kind: "select".into(),
            field: "status".into(),
            option: "choices".into(),
        };
        assert_eq!(err.to_string(), "missing required option 'choices' for select field 'status'");
    }
}
