//! The field engine facade.

use std::sync::Arc;

use serde_json::Value;

use super::declaration::Declaration;
use super::definition::{FieldDefinition, Operation};
use super::errors::{EngineError, ErrorMap, SchemaError};
use super::keywords;
use super::kinds::FieldKind;
use super::options::{OptionCache, ResolvedOptions};
use super::path::FieldPath;
use super::pipeline::Processor;
use super::populate::Populator;
use super::registry::DefinitionRegistry;
use crate::query::QueryCapability;
use crate::schema::{Collection, SchemaRegistry};

/// Population depth per field path when nothing else is configured.
pub const DEFAULT_MAX_DEPTH: usize = 30;

/// Processes, populates and indexes records against a schema registry.
///
/// The engine is synchronous. Query calls made by sanitizers, validators
/// and populators happen in declaration order on the calling thread.
#[derive(Debug)]
pub struct FieldEngine {
    definitions: Arc<DefinitionRegistry>,
    schemas: Arc<SchemaRegistry>,
    options: OptionCache,
    query: Option<QueryCapability>,
    max_depth: usize,
}

impl FieldEngine {
    /// Engine over the built-in field types with no query capability.
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            definitions: DefinitionRegistry::builtin(),
            schemas,
            options: OptionCache::new(),
            query: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_query(mut self, query: QueryCapability) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the field type registry.
    pub fn with_definitions(mut self, definitions: Arc<DefinitionRegistry>) -> Self {
        self.definitions = definitions;
        self.options.invalidate();
        self
    }

    /// Swap in a reloaded schema registry and drop every cached option.
    pub fn reload_schemas(&mut self, schemas: Arc<SchemaRegistry>) {
        self.schemas = schemas;
        self.options.invalidate();
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn query(&self) -> Option<&QueryCapability> {
        self.query.as_ref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn option_cache(&self) -> &OptionCache {
        &self.options
    }

    pub fn definition(&self, kind: FieldKind) -> Result<&Arc<FieldDefinition>, SchemaError> {
        self.definitions.get(kind).ok_or_else(|| SchemaError::UnknownKind(kind.to_string()))
    }

    /// Resolved options of `declaration` used as property `name`, cached.
    pub fn resolve_options(
        &self,
        name: &str,
        declaration: &Declaration,
    ) -> Result<Arc<ResolvedOptions>, SchemaError> {
        self.options.resolve(&self.definitions, name, declaration)
    }

    pub fn collection(&self, name: &str) -> Result<&Arc<Collection>, SchemaError> {
        self.schemas.collection(name).ok_or_else(|| SchemaError::UnknownCollection(name.to_string()))
    }

    /// Sanitize, match and validate the field at `path` inside `input`.
    ///
    /// `input` is the whole record; the field is updated in place.
    pub fn process(
        &self,
        path: &FieldPath,
        declaration: &Declaration,
        input: &mut Value,
        operation: Operation,
    ) -> Result<ErrorMap, EngineError> {
        let mut processor = Processor::new(self, operation, None, &[]);
        processor.field(input, path, declaration)?;
        Ok(processor.into_errors())
    }

    /// Process every declared field of a record of `collection`.
    ///
    /// `batch` holds the other records submitted together with this one.
    pub fn process_record(
        &self,
        collection: &str,
        input: &mut Value,
        operation: Operation,
        batch: &[Value],
    ) -> Result<ErrorMap, EngineError> {
        let schema = self.collection(collection)?;
        let mut processor = Processor::new(self, operation, Some(collection), batch);
        processor.record(schema, input)?;
        let errors = processor.into_errors();
        tracing::debug!(collection, %operation, errors = errors.len(), "record processed");
        Ok(errors)
    }

    /// Process several records together. Each record sees the others as its
    /// batch; errors of record `i` are prefixed with `i`.
    ///
    /// Every record is sanitized before any is validated, so batch
    /// constraints compare sanitized siblings.
    pub fn process_batch(
        &self,
        collection: &str,
        inputs: &mut [Value],
        operation: Operation,
    ) -> Result<ErrorMap, EngineError> {
        let schema = self.collection(collection)?;
        let raw = siblings(inputs);
        let sanitized: Vec<Vec<Value>>;

        let mut processors = Vec::with_capacity(inputs.len());
        for (input, batch) in inputs.iter_mut().zip(&raw) {
            let mut processor = Processor::new(self, operation, Some(collection), batch);
            let accepted = processor.sanitize_record(schema, input)?;
            processors.push((processor, accepted));
        }

        sanitized = siblings(inputs);
        let mut errors = ErrorMap::new();
        let records = processors.into_iter().zip(inputs.iter_mut()).enumerate();
        for (i, ((mut processor, accepted), input)) in records {
            if accepted {
                processor.set_batch(&sanitized[i]);
                processor.check_record(schema, input)?;
            }
            let record_errors = processor.into_errors();
            tracing::debug!(
                collection,
                %operation,
                index = i,
                errors = record_errors.len(),
                "record processed"
            );
            errors.merge_prefixed(&i.to_string(), record_errors);
        }
        Ok(errors)
    }

    /// Populate one stored field value.
    pub fn populate(
        &self,
        path: &FieldPath,
        declaration: &Declaration,
        value: Value,
    ) -> Result<Value, EngineError> {
        Populator::new(self).value(value, path, declaration, None)
    }

    /// Populate every declared field of a stored record.
    pub fn populate_record(&self, collection: &str, record: Value) -> Result<Value, EngineError> {
        Populator::new(self).record(collection, record)
    }

    pub fn extract_keywords(
        &self,
        path: &FieldPath,
        declaration: &Declaration,
        value: &Value,
    ) -> Result<String, EngineError> {
        keywords::extract(self, path, declaration, value)
    }

    /// Keywords of a record's search fields.
    pub fn extract_record_keywords(&self, collection: &str, record: &Value) -> Result<String, EngineError> {
        let schema = self.collection(collection)?;
        keywords::record(self, schema, record)
    }
}

/// For each record, every other record of the batch in order.
fn siblings(records: &[Value]) -> Vec<Vec<Value>> {
    (0..records.len())
        .map(|i| {
            records
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, record)| record.clone())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Schema;

    fn engine() -> FieldEngine {
        let mut fields = Schema::new();
        fields.insert("title".into(), Declaration::new(FieldKind::Text));
        let schemas = SchemaRegistry::new().with_collection(Collection::new("posts", fields)).unwrap();
        FieldEngine::new(Arc::new(schemas))
    }

    #[test]
    fn test_unknown_collection_is_a_defect() {
        let mut input = serde_json::json!({});
        let err = engine().process_record("pages", &mut input, Operation::Create, &[]).unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::UnknownCollection(name)) if name == "pages"));
    }

    #[test]
    fn test_missing_definition() {
        let engine = engine().with_definitions(Arc::new(DefinitionRegistry::new()));
        let err = engine.definition(FieldKind::Text).unwrap_err();
        assert_eq!(err, SchemaError::UnknownKind("text".into()));
    }

    #[test]
    fn test_reload_invalidates_options() {
        let mut engine = engine();
        engine.resolve_options("title", &Declaration::new(FieldKind::Text)).unwrap();
        assert_eq!(engine.option_cache().len(), 1);

        engine.reload_schemas(Arc::new(SchemaRegistry::new()));
        assert!(engine.option_cache().is_empty());
        assert_eq!(engine.option_cache().generation(), 1);
    }
}
