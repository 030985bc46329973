//! In-memory record source.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};

use super::{Filter, QueryError, QueryRequest, RecordSource};
use crate::fields::value::strict_eq;

/// Records kept in memory, grouped by collection.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, collection: &str, records: Vec<Value>) -> Self {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .extend(records);
        self
    }

    /// Build from a JSON object mapping collection names to record arrays.
    pub fn from_json(value: Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::Source("record fixture must be an object".to_string()));
        };
        let mut source = Self::new();
        for (collection, records) in map {
            let Value::Array(records) = records else {
                return Err(QueryError::Source(format!(
                    "records of '{collection}' must be an array"
                )));
            };
            source = source.with_records(&collection, records);
        }
        Ok(source)
    }

    /// Append a record to `collection`, creating the collection if needed.
    pub fn insert(&self, collection: &str, record: Value) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        self.collections.read().unwrap_or_else(PoisonError::into_inner).values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn member<'v>(record: &'v Value, field: &str) -> &'v Value {
    record.get(field).unwrap_or(&Value::Null)
}

fn matches(record: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, value) => strict_eq(member(record, field), value),
        Filter::Ne(field, value) => !strict_eq(member(record, field), value),
        Filter::In(field, values) => values.iter().any(|v| strict_eq(member(record, field), v)),
    }
}

fn project(record: &Value, select: &[String]) -> Value {
    if select.is_empty() {
        return record.clone();
    }
    let projected: Map<String, Value> = select
        .iter()
        .filter_map(|field| record.get(field).map(|v| (field.clone(), v.clone())))
        .collect();
    Value::Object(projected)
}

impl RecordSource for MemorySource {
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<Value>, QueryError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        let records = collections
            .get(&request.collection)
            .ok_or_else(|| QueryError::UnknownCollection(request.collection.clone()))?;

        Ok(records
            .iter()
            .filter(|record| request.filters.iter().all(|f| matches(record, f)))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|record| project(record, &request.select))
            .collect())
    }
}
