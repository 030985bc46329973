//! The processing pipeline: sanitize, conditional match, validate.
//!
//! A record is processed in two passes. The sanitize pass visits every
//! declared field (recursing into composites) so that conditional logic and
//! validators in the second pass see the fully sanitized record.
//!
//! Per field the order is fixed:
//!
//! 1. sanitize: definition sanitizers, then declaration extras; failures are
//!    swallowed and the previous value is kept
//! 2. conditional match: on mismatch the field is reset and not validated
//! 3. validate: the first failure is recorded and the field is reset

use serde_json::Value;

use super::declaration::Declaration;
use super::definition::{DefaultContext, FieldContext, FieldDefinition, MatchOutcome, Operation};
use super::engine::FieldEngine;
use super::errors::{
    EngineError, ErrorMap, FieldError, FieldResult, IMMUTABLE, INVALID_INPUT_TYPE, NOT_UNIQUE,
    UNRECOGNIZED_FIELD,
};
use super::options::ResolvedOptions;
use super::path::FieldPath;
use super::value::strict_eq;
use super::walk::{self, Shape};
use crate::schema::Collection;

/// Record member that is always accepted next to the declared fields.
pub const ID_FIELD: &str = "id";

/// State of one processing operation.
pub(crate) struct Processor<'a> {
    engine: &'a FieldEngine,
    operation: Operation,
    collection: Option<&'a str>,
    batch: &'a [Value],
    errors: ErrorMap,
}

impl<'a> Processor<'a> {
    pub fn new(
        engine: &'a FieldEngine,
        operation: Operation,
        collection: Option<&'a str>,
        batch: &'a [Value],
    ) -> Self {
        Self { engine, operation, collection, batch, errors: ErrorMap::new() }
    }

    pub fn into_errors(self) -> ErrorMap {
        self.errors
    }

    /// Process one field of `root` located at `path`.
    pub fn field(
        &mut self,
        root: &mut Value,
        path: &FieldPath,
        declaration: &Declaration,
    ) -> Result<(), EngineError> {
        self.sanitize(root, path, declaration)?;
        self.check(root, path, declaration)
    }

    /// Process every declared field of a collection record.
    pub fn record(&mut self, collection: &Collection, root: &mut Value) -> Result<(), EngineError> {
        if self.sanitize_record(collection, root)? {
            self.check_record(collection, root)?;
        }
        Ok(())
    }

    /// Drop undeclared members and sanitize every declared field.
    ///
    /// Returns `false` when the record is not an object and was rejected.
    pub fn sanitize_record(
        &mut self,
        collection: &Collection,
        root: &mut Value,
    ) -> Result<bool, EngineError> {
        let Value::Object(map) = &mut *root else {
            self.errors.insert(&FieldPath::root(), INVALID_INPUT_TYPE);
            return Ok(false);
        };

        let unknown: Vec<String> = map
            .keys()
            .filter(|k| k.as_str() != ID_FIELD && !collection.fields.contains_key(*k))
            .cloned()
            .collect();
        for key in unknown {
            map.remove(&key);
            self.errors.insert(&FieldPath::root().child(key), UNRECOGNIZED_FIELD);
        }

        for (path, declaration) in self.record_fields(collection, root) {
            self.sanitize(root, &path, declaration)?;
        }
        Ok(true)
    }

    /// Conditional match and validate every declared field of a sanitized
    /// record.
    pub fn check_record(
        &mut self,
        collection: &Collection,
        root: &mut Value,
    ) -> Result<(), EngineError> {
        for (path, declaration) in self.record_fields(collection, root) {
            self.check(root, &path, declaration)?;
        }
        Ok(())
    }

    /// Declared fields taking part in this operation. Updates only touch the
    /// fields present in the input.
    fn record_fields<'c>(
        &self,
        collection: &'c Collection,
        root: &Value,
    ) -> Vec<(FieldPath, &'c Declaration)> {
        collection
            .fields
            .iter()
            .map(|(name, declaration)| (FieldPath::root().child(name.as_str()), declaration))
            .filter(|(path, _)| self.operation != Operation::Update || path.lookup(root).is_some())
            .collect()
    }

    /// Compare batch constraints against `batch` from now on.
    pub fn set_batch(&mut self, batch: &'a [Value]) {
        self.batch = batch;
    }

    fn sanitize(
        &mut self,
        root: &mut Value,
        path: &FieldPath,
        declaration: &Declaration,
    ) -> Result<(), EngineError> {
        let engine = self.engine;
        let definition = engine.definition(declaration.kind)?;
        let options = engine.resolve_options(path.name(), declaration)?;

        let value = match path.lookup(root) {
            Some(value) => value.clone(),
            None if !(definition.input_meta.required && options.bool("required")) => {
                path.set(root, default_value(definition, &options, path));
                return Ok(());
            }
            None => Value::Null,
        };

        let sanitized = {
            let ctx = self.context(path, definition, declaration, &options, root);
            definition
                .sanitizers
                .iter()
                .chain(&declaration.additional.sanitizers)
                .filter(|s| s.filter.applies(self.operation))
                .fold(value, |value, sanitizer| match (sanitizer.handler)(value.clone(), &ctx) {
                    Ok(sanitized) => sanitized,
                    Err(err) => {
                        tracing::debug!(field = %path, error = %err, "sanitizer failed, keeping value");
                        value
                    }
                })
        };
        path.set(root, sanitized);

        if !definition.input_meta.composite {
            return Ok(());
        }

        let shape = match path.lookup_mut(root) {
            Some(value) => walk::normalize_shape(
                engine.schemas(),
                path,
                declaration,
                &options,
                value,
                &mut self.errors,
            ),
            None => Shape::Valid,
        };
        if shape == Shape::Invalidated {
            path.set(root, default_value(definition, &options, path));
            return Ok(());
        }

        let value = path.lookup(root).cloned().unwrap_or(Value::Null);
        for member in walk::members(engine.schemas(), path, declaration, &value) {
            self.sanitize(root, &member.path, member.declaration)?;
        }
        Ok(())
    }

    fn check(
        &mut self,
        root: &mut Value,
        path: &FieldPath,
        declaration: &Declaration,
    ) -> Result<(), EngineError> {
        let engine = self.engine;
        let definition = engine.definition(declaration.kind)?;
        let options = engine.resolve_options(path.name(), declaration)?;
        let Some(value) = path.lookup(root).cloned() else {
            return Ok(());
        };

        if let Some(logic) = &declaration.additional.conditional_logic {
            let ctx = self.context(path, definition, declaration, &options, root);
            if let MatchOutcome::Skip(reset) = (definition.conditional_logic_matcher)(&ctx, logic)? {
                path.set(root, reset);
                return Ok(());
            }
        }

        let failure = {
            let ctx = self.context(path, definition, declaration, &options, root);
            self.validate(&value, &ctx)?
        };
        if let Some(message) = failure {
            self.errors.insert(path, message);
            path.set(root, default_value(definition, &options, path));
            return Ok(());
        }

        if definition.input_meta.composite {
            for member in walk::members(engine.schemas(), path, declaration, &value) {
                self.check(root, &member.path, member.declaration)?;
            }
        }
        Ok(())
    }

    /// Run the validators; the first failure's message is returned.
    fn validate(&self, value: &Value, ctx: &FieldContext<'_>) -> Result<Option<String>, EngineError> {
        let additional = &ctx.declaration.additional;
        let validators = ctx
            .definition
            .validators
            .iter()
            .chain(&additional.validators)
            .filter(|v| v.filter.applies(self.operation));

        let mut result = Ok(());
        for validator in validators {
            result = (validator.handler)(value, ctx);
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() && additional.unique {
            result = check_unique(value, ctx);
        }
        if result.is_ok() && additional.immutable && self.operation == Operation::Update {
            result = check_immutable(value, ctx);
        }

        match result {
            Ok(()) => Ok(None),
            Err(FieldError::Engine(err)) => Err(*err),
            Err(err) => Ok(Some(err.to_string())),
        }
    }

    fn context<'c>(
        &'c self,
        path: &'c FieldPath,
        definition: &'c FieldDefinition,
        declaration: &'c Declaration,
        options: &'c ResolvedOptions,
        root: &'c Value,
    ) -> FieldContext<'c> {
        FieldContext {
            path,
            definition,
            declaration,
            options,
            operation: self.operation,
            input: root,
            collection: self.collection,
            batch: self.batch,
            query: self.engine.query(),
        }
    }
}

fn default_value(definition: &FieldDefinition, options: &ResolvedOptions, path: &FieldPath) -> Value {
    (definition.default)(&DefaultContext { definition, options, name: path.name() })
}

/// No stored record of the collection and no other record of the batch may
/// hold the same value. Only top-level fields are checked.
fn check_unique(value: &Value, ctx: &FieldContext<'_>) -> FieldResult<()> {
    if value.is_null() || ctx.path.depth() != 1 {
        return Ok(());
    }
    let name = ctx.name();

    if ctx.batch.iter().any(|record| record.get(name).is_some_and(|other| strict_eq(other, value))) {
        return Err(FieldError::message(NOT_UNIQUE));
    }

    let (Some(query), Some(collection)) = (ctx.query, ctx.collection) else {
        return Ok(());
    };
    let mut existing = query.query(collection).where_eq(name, value.clone());
    if let Some(id) = ctx.record_id() {
        existing = existing.where_ne(ID_FIELD, id.clone());
    }
    if existing.exists()? {
        return Err(FieldError::message(NOT_UNIQUE));
    }
    Ok(())
}

/// The stored value of the record being updated may not change.
fn check_immutable(value: &Value, ctx: &FieldContext<'_>) -> FieldResult<()> {
    let (Some(query), Some(collection), Some(id)) = (ctx.query, ctx.collection, ctx.record_id())
    else {
        return Ok(());
    };
    let name = ctx.name();
    let stored = query.query(collection).select([name]).where_eq(ID_FIELD, id.clone()).first()?;
    match stored.as_ref().and_then(|record| record.get(name)) {
        Some(previous) if !strict_eq(previous, value) => Err(FieldError::message(IMMUTABLE)),
        _ => Ok(()),
    }
}
