//! Option resolution.
//!
//! Every field type declares its options in order. Resolving a declaration
//! walks that order, taking the supplied value or calling the option's
//! default generator. Generators see every option resolved before them, so
//! an option may default to a value computed from earlier ones (a range's
//! `max-range` defaults to `max - min`). Declaration order is therefore part
//! of a field type's contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::declaration::{Declaration, Schema};
use super::definition::{FieldDefinition, OptionContext};
use super::errors::SchemaError;
use super::registry::DefinitionRegistry;

/// Concrete option values of one declaration, including its nested ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedOptions {
    values: Map<String, Value>,
    subfields: IndexMap<String, Arc<ResolvedOptions>>,
    variants: IndexMap<String, IndexMap<String, Arc<ResolvedOptions>>>,
}

impl ResolvedOptions {
    /// Build from plain values (no nested declarations).
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self { values, ..Default::default() }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The resolved value, `null` when unset.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name).as_bool().unwrap_or(false)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    pub fn count(&self, name: &str) -> Option<usize> {
        self.get(name).as_u64().map(|n| n as usize)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    /// String items of an array option.
    pub fn strings(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).as_array().map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// Options of a repeater or object subfield.
    pub fn subfield(&self, name: &str) -> Option<&Arc<ResolvedOptions>> {
        self.subfields.get(name)
    }

    /// Options of a structure variant's subfield.
    pub fn variant(&self, key: &str, name: &str) -> Option<&Arc<ResolvedOptions>> {
        self.variants.get(key).and_then(|v| v.get(name))
    }
}

/// Resolve the options of `declaration` used as property `name`.
///
/// Nested subfields and structure variants are resolved recursively.
pub fn resolve(
    definitions: &DefinitionRegistry,
    name: &str,
    declaration: &Declaration,
) -> Result<ResolvedOptions, SchemaError> {
    let definition = definitions
        .get(declaration.kind)
        .ok_or_else(|| SchemaError::UnknownKind(declaration.kind.to_string()))?;

    let values = resolve_values(definition, name, &declaration.options)?;

    let subfields = resolve_schema(definitions, &declaration.subfields)?;
    let mut variants = IndexMap::new();
    for (key, schema) in &declaration.structure {
        variants.insert(key.clone(), resolve_schema(definitions, schema)?);
    }

    Ok(ResolvedOptions { values, subfields, variants })
}

fn resolve_schema(
    definitions: &DefinitionRegistry,
    schema: &Schema,
) -> Result<IndexMap<String, Arc<ResolvedOptions>>, SchemaError> {
    schema
        .iter()
        .map(|(sub_name, sub)| Ok((sub_name.clone(), Arc::new(resolve(definitions, sub_name, sub)?))))
        .collect()
}

/// Resolve the flat option values of one definition in declaration order.
pub fn resolve_values(
    definition: &FieldDefinition,
    name: &str,
    supplied: &Map<String, Value>,
) -> Result<Map<String, Value>, SchemaError> {
    if let Some(unknown) = supplied.keys().find(|k| !definition.options.contains_key(*k)) {
        return Err(SchemaError::UnknownOption {
            kind: definition.name.to_string(),
            field: name.to_string(),
            option: unknown.clone(),
        });
    }

    let mut resolved = Map::new();
    for (option_name, option) in &definition.options {
        let value = match supplied.get(option_name) {
            Some(value) => {
                if !option.kind.accepts(value) {
                    return Err(SchemaError::InvalidOption {
                        kind: definition.name.to_string(),
                        field: name.to_string(),
                        option: option_name.clone(),
                        expected: option.kind.as_str().to_string(),
                    });
                }
                value.clone()
            }
            None if option.required => {
                return Err(SchemaError::MissingOption {
                    kind: definition.name.to_string(),
                    field: name.to_string(),
                    option: option_name.clone(),
                });
            }
            None => (option.default)(&OptionContext { definition, options: &resolved, name }),
        };
        resolved.insert(option_name.clone(), value);
    }

    Ok(resolved)
}

/// Memoized option resolution with an explicit lifetime.
///
/// Entries live until [`OptionCache::invalidate`] starts a new generation,
/// typically after a schema reload.
#[derive(Debug, Default)]
pub struct OptionCache {
    generation: AtomicU64,
    entries: RwLock<HashMap<(String, String), Arc<ResolvedOptions>>>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache. Repeated calls for the same declaration and
    /// property return the same `Arc`.
    pub fn resolve(
        &self,
        definitions: &DefinitionRegistry,
        name: &str,
        declaration: &Declaration,
    ) -> Result<Arc<ResolvedOptions>, SchemaError> {
        let key = (declaration.cache_key(), name.to_string());

        if let Some(hit) = self.entries.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            tracing::trace!(field = name, "option cache hit");
            return Ok(Arc::clone(hit));
        }

        let resolved = Arc::new(resolve(definitions, name, declaration)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(resolved)))
    }

    /// Current schema-load generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drop every entry and start a new generation.
    pub fn invalidate(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(generation = self.generation(), "option cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
