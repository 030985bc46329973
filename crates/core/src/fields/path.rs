//! Dotted field paths addressing values inside a record.
//!
//! Paths double as error-map keys, so their textual form follows the
//! platform convention: array indices append as `.<index>`, block fields as
//! `.fields.<name>` and slot entries as `.slots.<slot>.<index>`.

use std::fmt;

use serde_json::Value;

/// Location of a value inside a record, one segment per object key or array
/// index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The empty path, addressing the record itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path such as `blocks.0.fields.title`.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        }
    }

    /// Append an object key.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Append an array index.
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// Append every segment of `other`.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, or an empty string for the root path.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Path of the containing value.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Resolve a reference against this path the way a relative URL resolves
    /// against its base.
    ///
    /// The last segment of `self` is the "file": `name` and `./name` address
    /// a sibling, `../name` the parent's sibling, `..` the parent container
    /// itself and `/name` a top-level field. Dotted and numeric segments drill
    /// further into nested objects and arrays.
    pub fn resolve(&self, reference: &str) -> Self {
        let (mut segments, rest) = match reference.strip_prefix('/') {
            Some(rest) => (Vec::new(), rest),
            None => (self.parent().segments, reference),
        };

        for part in rest.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.extend(
                    other.split('.').filter(|s| !s.is_empty()).map(ToOwned::to_owned),
                ),
            }
        }

        Self { segments }
    }

    /// Borrow the value at this path, if present.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments.iter().try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Mutably borrow the value at this path, if present.
    pub fn lookup_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Store `value` at this path.
    ///
    /// Object keys are inserted when missing; array slots must already exist.
    /// Returns `false` when the parent container is missing.
    pub fn set(&self, root: &mut Value, value: Value) -> bool {
        let Some((last, _)) = self.segments.split_last() else {
            *root = value;
            return true;
        };

        match self.parent().lookup_mut(root) {
            Some(Value::Object(map)) => {
                map.insert(last.clone(), value);
                true
            }
            Some(Value::Array(items)) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
