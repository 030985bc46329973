//! The population pipeline: stored values into read representations.
//!
//! Relation graphs may be cyclic. Every populator call is charged against a
//! per-operation [`DepthBudget`] keyed by `collection:path`; once a key is
//! spent the field's terminal value is returned instead.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use super::declaration::Declaration;
use super::engine::FieldEngine;
use super::errors::EngineError;
use super::options::ResolvedOptions;
use super::path::FieldPath;
use super::walk;
use crate::query::QueryCapability;

/// Remaining populator invocations per population key.
#[derive(Debug)]
pub struct DepthBudget {
    max_depth: usize,
    remaining: RefCell<HashMap<String, usize>>,
}

impl DepthBudget {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth, remaining: RefCell::new(HashMap::new()) }
    }

    /// Charge one invocation to `key`. Returns `false` once it is spent.
    pub fn take(&self, key: &str) -> bool {
        let mut remaining = self.remaining.borrow_mut();
        let left = remaining.entry(key.to_string()).or_insert(self.max_depth);
        if *left == 0 {
            return false;
        }
        *left -= 1;
        true
    }

    pub fn remaining(&self, key: &str) -> usize {
        self.remaining.borrow().get(key).copied().unwrap_or(self.max_depth)
    }
}

/// What a populator sees.
pub struct PopulateContext<'a> {
    pub path: &'a FieldPath,
    pub declaration: &'a Declaration,
    pub options: &'a ResolvedOptions,
    /// Collection owning the record being populated, if any.
    pub collection: Option<&'a str>,
    populator: &'a Populator<'a>,
}

impl PopulateContext<'_> {
    pub fn query(&self) -> Option<&QueryCapability> {
        self.populator.engine.query()
    }

    /// Populate a related record through its collection's schema, sharing
    /// this operation's depth budget.
    pub fn populate_record(&self, collection: &str, record: Value) -> Result<Value, EngineError> {
        self.populator.record(collection, record)
    }
}

/// State of one population operation.
pub(crate) struct Populator<'a> {
    engine: &'a FieldEngine,
    budget: DepthBudget,
}

impl<'a> Populator<'a> {
    pub fn new(engine: &'a FieldEngine) -> Self {
        Self { engine, budget: DepthBudget::new(engine.max_depth()) }
    }

    pub fn record(&self, collection: &str, mut record: Value) -> Result<Value, EngineError> {
        let schema = self.engine.collection(collection)?;
        for (name, declaration) in &schema.fields {
            let path = FieldPath::root().child(name.as_str());
            let Some(value) = path.lookup(&record).cloned() else { continue };
            let populated = self.value(value, &path, declaration, Some(collection))?;
            path.set(&mut record, populated);
        }
        Ok(record)
    }

    pub fn value(
        &self,
        mut value: Value,
        path: &FieldPath,
        declaration: &Declaration,
        collection: Option<&str>,
    ) -> Result<Value, EngineError> {
        if declaration.additional.population == Some(false) {
            return Ok(value);
        }

        let definition = self.engine.definition(declaration.kind)?;
        let options = self.engine.resolve_options(path.name(), declaration)?;

        if definition.input_meta.composite {
            for member in walk::members(self.engine.schemas(), path, declaration, &value) {
                let Some(child) = member.relative.lookup(&value).cloned() else { continue };
                let populated = self.value(child, &member.path, member.declaration, collection)?;
                member.relative.set(&mut value, populated);
            }
        }

        let Some(population) =
            declaration.additional.populator.as_ref().or(definition.population.as_ref())
        else {
            return Ok(value);
        };

        let key = format!("{}:{path}", collection.unwrap_or_default());
        if !self.budget.take(&key) {
            tracing::trace!(key = %key, "population depth exhausted");
            return Ok(population.terminal.clone());
        }

        let ctx = PopulateContext { path, declaration, options: &options, collection, populator: self };
        match (population.populator)(value.clone(), &ctx) {
            Ok(populated) => Ok(populated),
            Err(err) => {
                tracing::debug!(field = %path, error = %err, "populator failed, keeping value");
                Ok(value)
            }
        }
    }
}
