//! Field types, declarations and the pipelines that run them.
//!
//! A field type is described once as a [`FieldSpec`], normalized into a
//! [`FieldDefinition`] and registered in a [`DefinitionRegistry`]. Schemas
//! use field types through [`Declaration`]s. The [`FieldEngine`] drives the
//! processing, population and keyword pipelines over those declarations.
//!
//! ```
//! use fieldkit_core::fields::{Declaration, FieldEngine, FieldKind, FieldPath, Operation};
//! use fieldkit_core::schema::SchemaRegistry;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let engine = FieldEngine::new(Arc::new(SchemaRegistry::new()));
//! let decl = Declaration::new(FieldKind::Text).option("max-length", 5);
//! let mut record = json!({ "title": "  hello  " });
//!
//! let errors = engine
//!     .process(&FieldPath::parse("title"), &decl, &mut record, Operation::Create)
//!     .unwrap();
//! assert!(errors.is_empty());
//! assert_eq!(record["title"], "hello");
//! ```

pub mod builtin;
pub mod declaration;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod keywords;
pub mod kinds;
pub mod logic;
pub mod options;
pub mod path;
pub mod pipeline;
pub mod populate;
pub mod registry;
pub mod value;
pub mod walk;

pub use declaration::{Additional, Declaration, Schema};
pub use definition::{
    FieldContext, FieldDefinition, FieldOption, FieldSpec, MatchOutcome, Operation, OptionKind,
    Population, Sanitizer, TypeSpec, Validator, ValueType, normalize,
};
pub use engine::{DEFAULT_MAX_DEPTH, FieldEngine};
pub use errors::{EngineError, ErrorMap, FieldError, FieldResult, LogicError, SchemaError};
pub use kinds::FieldKind;
pub use logic::ConditionalLogic;
pub use options::{OptionCache, ResolvedOptions};
pub use path::FieldPath;
pub use populate::{DepthBudget, PopulateContext};
pub use registry::{DefinitionRegistry, RegistryError};
