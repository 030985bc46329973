//! Field definitions: the reusable, registry-held implementation of a field
//! type.
//!
//! A [`FieldSpec`] is the declarative form a field type is written in. It may
//! leave most behavior out; [`normalize`] fills every gap with the platform
//! defaults and produces the canonical [`FieldDefinition`] the pipelines run.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::declaration::Declaration;
use super::errors::{FieldResult, LogicError};
use super::kinds::FieldKind;
use super::logic::{self, ConditionalLogic};
use super::options::ResolvedOptions;
use super::path::FieldPath;
use super::populate::PopulateContext;
use super::value::to_plain_string;
use crate::query::QueryCapability;

/// Which record operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Read,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "read" => Ok(Self::Read),
            _ => Err(format!("unknown operation: {}", s)),
        }
    }
}

/// Runtime type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsType {
    Boolean,
    Number,
    Object,
    String,
}

/// Storage column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DbType {
    Boolean,
    Decimal,
    Integer,
    Text,
}

/// The `{js, ts, db}` triple describing a field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    pub js: JsType,
    pub ts: String,
    pub db: DbType,
}

impl ValueType {
    pub fn new(js: JsType, ts: impl Into<String>, db: DbType) -> Self {
        Self { js, ts: ts.into(), db }
    }
}

/// How a field spec names its value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// Only the runtime type; the rest is inferred.
    Shorthand(JsType),
    /// Fully spelled out.
    Full(ValueType),
}

impl TypeSpec {
    fn expand(self) -> ValueType {
        match self {
            Self::Full(value_type) => value_type,
            Self::Shorthand(js) => {
                let (ts, db) = match js {
                    JsType::Boolean => ("boolean", DbType::Boolean),
                    JsType::Number => ("number", DbType::Decimal),
                    JsType::Object => ("Record<string, any>", DbType::Text),
                    JsType::String => ("string", DbType::Text),
                };
                ValueType::new(js, ts, db)
            }
        }
    }
}

/// Runs a stage only for the flagged operations; no flags means always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationFilter {
    pub on_create: bool,
    pub on_update: bool,
    pub on_read: bool,
}

impl OperationFilter {
    pub fn applies(&self, operation: Operation) -> bool {
        if !(self.on_create || self.on_update || self.on_read) {
            return true;
        }
        match operation {
            Operation::Create => self.on_create,
            Operation::Update => self.on_update,
            Operation::Read => self.on_read,
        }
    }
}

/// Context handed to a definition's `default` generator.
pub struct DefaultContext<'a> {
    pub definition: &'a FieldDefinition,
    pub options: &'a ResolvedOptions,
    pub name: &'a str,
}

/// Context handed to an option's default generator.
///
/// `options` holds every option resolved so far, in declaration order.
pub struct OptionContext<'a> {
    pub definition: &'a FieldDefinition,
    pub options: &'a Map<String, Value>,
    pub name: &'a str,
}

impl OptionContext<'_> {
    /// Numeric value of an already-resolved option.
    pub fn number(&self, option: &str) -> Option<f64> {
        self.options.get(option).and_then(Value::as_f64)
    }
}

/// Everything a sanitizer or validator can see about the field it runs on.
pub struct FieldContext<'a> {
    pub path: &'a FieldPath,
    pub definition: &'a FieldDefinition,
    pub declaration: &'a Declaration,
    pub options: &'a ResolvedOptions,
    pub operation: Operation,
    /// The whole record being processed, read-only.
    pub input: &'a Value,
    pub collection: Option<&'a str>,
    /// Other records of the same batch, read-only.
    pub batch: &'a [Value],
    pub query: Option<&'a QueryCapability>,
}

impl FieldContext<'_> {
    /// Field name (last path segment).
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The definition default for this declaration.
    pub fn default_value(&self) -> Value {
        (self.definition.default)(&DefaultContext {
            definition: self.definition,
            options: self.options,
            name: self.path.name(),
        })
    }

    /// The `id` of the record being processed, when it has one.
    pub fn record_id(&self) -> Option<&Value> {
        self.input.get("id").filter(|id| !id.is_null())
    }
}

/// Context for keyword extraction of a leaf field.
pub struct KeywordContext<'a> {
    pub path: &'a FieldPath,
    pub definition: &'a FieldDefinition,
    pub options: &'a ResolvedOptions,
}

/// Result of the conditional match stage.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Conditions hold; continue with validation.
    Proceed,
    /// Conditions fail; store the value and skip validation.
    Skip(Value),
}

pub type DefaultFn = Arc<dyn Fn(&DefaultContext<'_>) -> Value + Send + Sync>;
pub type OptionDefaultFn = Arc<dyn Fn(&OptionContext<'_>) -> Value + Send + Sync>;
pub type SanitizeFn = Arc<dyn Fn(Value, &FieldContext<'_>) -> FieldResult<Value> + Send + Sync>;
pub type ValidateFn = Arc<dyn Fn(&Value, &FieldContext<'_>) -> FieldResult<()> + Send + Sync>;
pub type PopulateFn = Arc<dyn Fn(Value, &PopulateContext<'_>) -> FieldResult<Value> + Send + Sync>;
pub type KeywordFn = Arc<dyn Fn(&Value, &KeywordContext<'_>) -> String + Send + Sync>;
pub type MatcherFn = Arc<
    dyn Fn(&FieldContext<'_>, &ConditionalLogic) -> Result<MatchOutcome, LogicError> + Send + Sync,
>;
pub type CodecFn = fn(&Value) -> Value;

/// Type tag of a field option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Any,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl OptionKind {
    /// Whether a supplied value fits this tag. `null` always fits.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// A named, typed configuration slot of a field type.
#[derive(Clone)]
pub struct FieldOption {
    pub kind: OptionKind,
    pub required: bool,
    pub default: OptionDefaultFn,
}

impl FieldOption {
    /// Optional slot defaulting to `null`.
    pub fn new(kind: OptionKind) -> Self {
        Self { kind, required: false, default: Arc::new(|_| Value::Null) }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Use a constant default.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Arc::new(move |_| value.clone());
        self
    }

    /// Compute the default from previously resolved options.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&OptionContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.default = Arc::new(f);
        self
    }
}

impl fmt::Debug for FieldOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOption")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// A sanitizer with its operation filter.
#[derive(Clone)]
pub struct Sanitizer {
    pub handler: SanitizeFn,
    pub filter: OperationFilter,
}

impl Sanitizer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, &FieldContext<'_>) -> FieldResult<Value> + Send + Sync + 'static,
    {
        Self { handler: Arc::new(f), filter: OperationFilter::default() }
    }

    pub fn on_create(mut self) -> Self {
        self.filter.on_create = true;
        self
    }

    pub fn on_update(mut self) -> Self {
        self.filter.on_update = true;
        self
    }
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer").field("filter", &self.filter).finish_non_exhaustive()
    }
}

/// A validator with its operation filter.
#[derive(Clone)]
pub struct Validator {
    pub handler: ValidateFn,
    pub filter: OperationFilter,
}

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &FieldContext<'_>) -> FieldResult<()> + Send + Sync + 'static,
    {
        Self { handler: Arc::new(f), filter: OperationFilter::default() }
    }

    pub fn on_create(mut self) -> Self {
        self.filter.on_create = true;
        self
    }

    pub fn on_update(mut self) -> Self {
        self.filter.on_update = true;
        self
    }

    pub fn on_read(mut self) -> Self {
        self.filter.on_read = true;
        self
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("filter", &self.filter).finish_non_exhaustive()
    }
}

/// How a field turns casted values into populated ones.
#[derive(Clone)]
pub struct Population {
    /// Type of the populated value.
    pub value_type: ValueType,
    pub populator: PopulateFn,
    /// Returned instead of recursing once the depth budget is spent.
    pub terminal: Value,
}

impl Population {
    pub fn new<F>(value_type: ValueType, terminal: Value, f: F) -> Self
    where
        F: Fn(Value, &PopulateContext<'_>) -> FieldResult<Value> + Send + Sync + 'static,
    {
        Self { value_type, populator: Arc::new(f), terminal }
    }
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("value_type", &self.value_type)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

/// Hints for input widgets and the pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputMeta {
    /// Values contain nested declarations walked by the pipelines.
    pub composite: bool,
    /// Values are lists.
    pub multiple: bool,
    /// The type takes a `required` option. Set by [`normalize`].
    pub required: bool,
}

/// Declarative form of a field type. Everything but the name and type may be
/// left out.
pub struct FieldSpec {
    pub name: FieldKind,
    pub value_type: TypeSpec,
    pub default: Option<DefaultFn>,
    pub options: IndexMap<String, FieldOption>,
    pub sanitizers: Vec<Sanitizer>,
    pub validators: Vec<Validator>,
    pub population: Option<Population>,
    pub extract_keywords: Option<KeywordFn>,
    pub conditional_logic_matcher: Option<MatcherFn>,
    pub serialize: Option<CodecFn>,
    pub deserialize: Option<CodecFn>,
    pub input_meta: InputMeta,
}

impl FieldSpec {
    pub fn new(name: FieldKind, value_type: TypeSpec) -> Self {
        Self {
            name,
            value_type,
            default: None,
            options: IndexMap::new(),
            sanitizers: Vec::new(),
            validators: Vec::new(),
            population: None,
            extract_keywords: None,
            conditional_logic_matcher: None,
            serialize: None,
            deserialize: None,
            input_meta: InputMeta::default(),
        }
    }

    pub fn default<F>(mut self, f: F) -> Self
    where
        F: Fn(&DefaultContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(f));
        self
    }

    /// Declare an option. Declaration order is resolution order.
    pub fn option(mut self, name: &str, option: FieldOption) -> Self {
        self.options.insert(name.to_string(), option);
        self
    }

    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizers.push(sanitizer);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn population(mut self, population: Population) -> Self {
        self.population = Some(population);
        self
    }

    pub fn extract_keywords<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &KeywordContext<'_>) -> String + Send + Sync + 'static,
    {
        self.extract_keywords = Some(Arc::new(f));
        self
    }

    pub fn conditional_logic_matcher(mut self, matcher: MatcherFn) -> Self {
        self.conditional_logic_matcher = Some(matcher);
        self
    }

    pub fn codec(mut self, serialize: CodecFn, deserialize: CodecFn) -> Self {
        self.serialize = Some(serialize);
        self.deserialize = Some(deserialize);
        self
    }

    pub fn input_meta(mut self, input_meta: InputMeta) -> Self {
        self.input_meta = input_meta;
        self
    }
}

/// Canonical, fully specified field type.
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: FieldKind,
    pub value_type: ValueType,
    pub default: DefaultFn,
    pub options: IndexMap<String, FieldOption>,
    pub sanitizers: Vec<Sanitizer>,
    pub validators: Vec<Validator>,
    pub population: Option<Population>,
    pub extract_keywords: KeywordFn,
    pub conditional_logic_matcher: MatcherFn,
    pub serialize: Option<CodecFn>,
    pub deserialize: Option<CodecFn>,
    pub input_meta: InputMeta,
}

impl FieldDefinition {
    /// Produce the storage form of a casted value.
    pub fn serialize_value(&self, value: &Value) -> Value {
        self.serialize.map_or_else(|| value.clone(), |f| f(value))
    }

    /// Turn a stored value back into its casted form.
    pub fn deserialize_value(&self, value: &Value) -> Value {
        self.deserialize.map_or_else(|| value.clone(), |f| f(value))
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("sanitizers", &self.sanitizers.len())
            .field("validators", &self.validators.len())
            .field("population", &self.population)
            .field("input_meta", &self.input_meta)
            .finish_non_exhaustive()
    }
}

/// Fill every gap of a spec with the platform defaults. Pure; no I/O.
pub fn normalize(spec: FieldSpec) -> FieldDefinition {
    let required = spec.options.contains_key("required");
    FieldDefinition {
        name: spec.name,
        value_type: spec.value_type.expand(),
        default: spec.default.unwrap_or_else(|| Arc::new(|_| Value::Null)),
        options: spec.options,
        sanitizers: spec.sanitizers,
        validators: spec.validators,
        population: spec.population,
        extract_keywords: spec.extract_keywords.unwrap_or_else(default_keyword_extractor),
        conditional_logic_matcher: spec
            .conditional_logic_matcher
            .unwrap_or_else(default_conditional_logic_matcher),
        serialize: spec.serialize,
        deserialize: spec.deserialize,
        input_meta: InputMeta {
            required,
            ..spec.input_meta
        },
    }
}

/// Objects and arrays become JSON, `null` becomes empty, the rest is
/// stringified.
pub fn default_keyword_extractor() -> KeywordFn {
    Arc::new(|value, _| to_plain_string(value))
}

/// Evaluate the logic against the input; when it fails, reset the field to
/// its default and skip validation.
pub fn default_conditional_logic_matcher() -> MatcherFn {
    Arc::new(|ctx, conditions| {
        if logic::matches(ctx.input, ctx.path, conditions)? {
            Ok(MatchOutcome::Proceed)
        } else {
            Ok(MatchOutcome::Skip(ctx.default_value()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare(js: JsType) -> FieldDefinition {
        normalize(FieldSpec::new(FieldKind::Text, TypeSpec::Shorthand(js)))
    }

    #[test]
    fn test_shorthand_db_inference() {
        assert_eq!(bare(JsType::Boolean).value_type.db, DbType::Boolean);
        assert_eq!(bare(JsType::Number).value_type.db, DbType::Decimal);
        assert_eq!(bare(JsType::String).value_type.db, DbType::Text);
        assert_eq!(bare(JsType::Object).value_type.db, DbType::Text);
        assert_eq!(bare(JsType::Number).value_type.ts, "number");
    }

    #[test]
    fn test_full_type_kept() {
        let vt = ValueType::new(JsType::Number, "number | null", DbType::Integer);
        let def = normalize(FieldSpec::new(FieldKind::Record, TypeSpec::Full(vt.clone())));
        assert_eq!(def.value_type, vt);
    }

    #[test]
    fn test_missing_behavior_is_filled() {
        let def = bare(JsType::String);
        let options = ResolvedOptions::default();
        let ctx = DefaultContext { definition: &def, options: &options, name: "title" };
        assert_eq!((def.default)(&ctx), Value::Null);
        assert!(def.population.is_none());
        assert!(def.serialize.is_none());

        let path = FieldPath::parse("title");
        let kw = KeywordContext { path: &path, definition: &def, options: &options };
        assert_eq!((def.extract_keywords)(&json!({"a": 1}), &kw), "{\"a\":1}");
        assert_eq!((def.extract_keywords)(&Value::Null, &kw), "");
        assert_eq!((def.extract_keywords)(&json!(4.5), &kw), "4.5");
    }

    #[test]
    fn test_input_meta_records_required_option() {
        assert!(!bare(JsType::String).input_meta.required);

        let def = normalize(
            FieldSpec::new(FieldKind::Text, TypeSpec::Shorthand(JsType::String))
                .option("required", FieldOption::new(OptionKind::Boolean)),
        );
        assert!(def.input_meta.required);
        assert!(!def.input_meta.composite);

        let registry = crate::fields::DefinitionRegistry::builtin();
        let repeater = registry.get(FieldKind::Repeater).unwrap();
        assert!(repeater.input_meta.required && repeater.input_meta.composite);
    }

    #[test]
    fn test_operation_filter() {
        let always = OperationFilter::default();
        assert!(always.applies(Operation::Create));
        assert!(always.applies(Operation::Read));

        let create_only = OperationFilter { on_create: true, ..Default::default() };
        assert!(create_only.applies(Operation::Create));
        assert!(!create_only.applies(Operation::Update));
        assert!(!create_only.applies(Operation::Read));
    }

    #[test]
    fn test_option_kind_accepts() {
        assert!(OptionKind::Number.accepts(&json!(3)));
        assert!(OptionKind::Number.accepts(&Value::Null));
        assert!(!OptionKind::Number.accepts(&json!("3")));
        assert!(OptionKind::Any.accepts(&json!([1])));
    }
}
