//! Query capability injected into the field engine.
//!
//! Storage is out of scope for the engine. Sanitizers, validators and
//! populators only see a [`QueryCapability`], which hands out clonable
//! [`QueryBuilder`]s over an arbitrary [`RecordSource`].

pub mod memory;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use memory::MemorySource;

/// Errors raised by a record source.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("record source failed: {0}")]
    Source(String),
}

/// One predicate on a record member.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Ne(String, Value),
    In(String, Vec<Value>),
}

/// Everything a record source needs to answer a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub collection: String,
    /// Members to return; every member when empty.
    pub select: Vec<String>,
    /// Predicates, all of which must hold.
    pub filters: Vec<Filter>,
    /// Caller intends to populate the returned records.
    pub populate: bool,
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            select: Vec::new(),
            filters: Vec::new(),
            populate: false,
            limit: None,
        }
    }
}

/// A store of records, queried synchronously.
pub trait RecordSource: Send + Sync {
    /// Records matching `request`, projected onto `request.select`.
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<Value>, QueryError>;

    /// Number of matching records, ignoring `limit`.
    fn count(&self, request: &QueryRequest) -> Result<usize, QueryError> {
        let mut unbounded = request.clone();
        unbounded.limit = None;
        Ok(self.fetch(&unbounded)?.len())
    }
}

/// Shared handle on a record source.
#[derive(Clone)]
pub struct QueryCapability {
    source: Arc<dyn RecordSource>,
}

impl QueryCapability {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// Start a query on `collection`.
    pub fn query(&self, collection: &str) -> QueryBuilder {
        QueryBuilder { source: Arc::clone(&self.source), request: QueryRequest::new(collection) }
    }
}

impl fmt::Debug for QueryCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCapability").finish_non_exhaustive()
    }
}

/// Chainable query. Every method consumes and returns the builder; clone it
/// to branch.
#[derive(Clone)]
pub struct QueryBuilder {
    source: Arc<dyn RecordSource>,
    request: QueryRequest,
}

impl QueryBuilder {
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.request.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn where_ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.request.filters.push(Filter::Ne(field.to_string(), value.into()));
        self
    }

    pub fn where_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.request.filters.push(Filter::In(field.to_string(), values));
        self
    }

    pub fn populate(mut self, populate: bool) -> Self {
        self.request.populate = populate;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.request.limit = Some(limit);
        self
    }

    pub fn is_populated(&self) -> bool {
        self.request.populate
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn all(self) -> Result<Vec<Value>, QueryError> {
        self.source.fetch(&self.request)
    }

    pub fn first(self) -> Result<Option<Value>, QueryError> {
        Ok(self.limit(1).all()?.into_iter().next())
    }

    pub fn count(self) -> Result<usize, QueryError> {
        self.source.count(&self.request)
    }

    pub fn exists(self) -> Result<bool, QueryError> {
        Ok(self.select(["id"]).first()?.is_some())
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder").field("request", &self.request).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capability() -> QueryCapability {
        let source = MemorySource::new()
            .with_records("posts", vec![
                json!({ "id": 1, "title": "a", "rank": 2 }),
                json!({ "id": 2, "title": "b", "rank": 2 }),
                json!({ "id": 3, "title": "c", "rank": 5 }),
            ]);
        QueryCapability::new(Arc::new(source))
    }

    #[test]
    fn test_builder_does_not_mutate_clones() {
        let base = capability().query("posts").where_eq("rank", 2);
        let narrowed = base.clone().where_ne("id", 1);
        assert_eq!(base.request().filters.len(), 1);
        assert_eq!(narrowed.request().filters.len(), 2);
        assert_eq!(base.count().unwrap(), 2);
        assert_eq!(narrowed.count().unwrap(), 1);
    }

    #[test]
    fn test_select_and_first() {
        let first = capability().query("posts").select(["title"]).where_eq("id", 3).first().unwrap();
        assert_eq!(first, Some(json!({ "title": "c" })));
    }

    #[test]
    fn test_where_in_and_exists() {
        let q = capability().query("posts");
        let found = q.clone().where_in("id", vec![json!(1), json!(3), json!(9)]).all().unwrap();
        assert_eq!(found.len(), 2);
        assert!(q.clone().where_eq("title", "b").exists().unwrap());
        assert!(!q.where_eq("title", "z").exists().unwrap());
    }

    #[test]
    fn test_unknown_collection() {
        let err = capability().query("pages").all().unwrap_err();
        assert!(matches!(err, QueryError::UnknownCollection(name) if name == "pages"));
    }
}
