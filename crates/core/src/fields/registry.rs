//! Registry of field definitions.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use thiserror::Error;

use super::builtin;
use super::definition::{FieldDefinition, FieldSpec, normalize};
use super::kinds::FieldKind;

static BUILTIN: LazyLock<Arc<DefinitionRegistry>> = LazyLock::new(|| {
    let mut registry = DefinitionRegistry::new();
    for spec in builtin::specs() {
        let result = registry.register(spec);
        debug_assert!(result.is_ok(), "built-in field type listed twice: {result:?}");
    }
    Arc::new(registry)
});

/// Errors raised while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A definition for this field type already exists.
    #[error("duplicate field definition: {0}")]
    Duplicate(FieldKind),
}

/// One normalized definition per field type.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<FieldKind, Arc<FieldDefinition>>,
}

impl DefinitionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry of built-in field types.
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Normalize and register a field spec.
    pub fn register(&mut self, spec: FieldSpec) -> Result<(), RegistryError> {
        let definition = normalize(spec);
        if self.definitions.contains_key(&definition.name) {
            return Err(RegistryError::Duplicate(definition.name));
        }
        self.definitions.insert(definition.name, Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, kind: FieldKind) -> Option<&Arc<FieldDefinition>> {
        self.definitions.get(&kind)
    }

    pub fn contains(&self, kind: FieldKind) -> bool {
        self.definitions.contains_key(&kind)
    }

    /// Registered kinds, in `FieldKind::ALL` order.
    pub fn kinds(&self) -> Vec<FieldKind> {
        FieldKind::ALL.into_iter().filter(|k| self.contains(*k)).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::definition::{DbType, JsType, TypeSpec};

    #[test]
    fn test_empty_registry() {
        let registry = DefinitionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(FieldKind::Text).is_none());
    }

    #[test]
    fn test_builtin_covers_every_kind() {
        let registry = DefinitionRegistry::builtin();
        assert_eq!(registry.len(), FieldKind::ALL.len());
        assert_eq!(registry.kinds(), FieldKind::ALL.to_vec());
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(Arc::ptr_eq(&DefinitionRegistry::builtin(), &DefinitionRegistry::builtin()));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register(FieldSpec::new(FieldKind::Text, TypeSpec::Shorthand(JsType::String)))
            .unwrap();
        let result =
            registry.register(FieldSpec::new(FieldKind::Text, TypeSpec::Shorthand(JsType::String)));
        assert_eq!(result, Err(RegistryError::Duplicate(FieldKind::Text)));
    }

    #[test]
    fn test_registered_definition_is_normalized() {
        let mut registry = DefinitionRegistry::new();
        registry
            .register(FieldSpec::new(FieldKind::Checkbox, TypeSpec::Shorthand(JsType::Boolean)))
            .unwrap();
        let def = registry.get(FieldKind::Checkbox).unwrap();
        assert_eq!(def.value_type.db, DbType::Boolean);
    }
}
