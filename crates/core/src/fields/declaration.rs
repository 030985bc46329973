//! Use-site field declarations.
//!
//! A declaration picks a field type, supplies its options and optionally
//! attaches extra behavior. Composite declarations nest further declarations,
//! which is what every pipeline recurses over.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::definition::{Population, Sanitizer, Validator};
use super::kinds::FieldKind;
use super::logic::ConditionalLogic;

/// Ordered set of named declarations (a collection's fields, a block's
/// fields, a repeater's subfields).
pub type Schema = IndexMap<String, Declaration>;

/// Use-site configuration of a field.
#[derive(Debug, Clone, Deserialize)]
pub struct Declaration {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Supplied option values; the rest come from option defaults.
    #[serde(default)]
    pub options: Map<String, Value>,

    /// Subfields of `repeater` and `object` fields.
    #[serde(default)]
    pub subfields: Schema,

    /// Variants of `structure` fields, keyed by discriminator.
    #[serde(default)]
    pub structure: IndexMap<String, Schema>,

    #[serde(default)]
    pub additional: Additional,
}

/// Extra, per-use behavior layered on top of the field type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Additional {
    /// No two records may hold the same value.
    #[serde(default)]
    pub unique: bool,

    /// The value may be set on create but never changed by an update.
    #[serde(default)]
    pub immutable: bool,

    /// Validate only when the conditions hold.
    #[serde(default)]
    pub conditional_logic: Option<ConditionalLogic>,

    /// `Some(false)` keeps the casted value on read.
    #[serde(default)]
    pub population: Option<bool>,

    /// Replaces the definition's populator.
    #[serde(skip)]
    pub populator: Option<Population>,

    /// Run after the definition's sanitizers.
    #[serde(skip)]
    pub sanitizers: Vec<Sanitizer>,

    /// Run after the definition's validators.
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

impl Declaration {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            options: Map::new(),
            subfields: Schema::new(),
            structure: IndexMap::new(),
            additional: Additional::default(),
        }
    }

    pub fn option(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    pub fn required(self) -> Self {
        self.option("required", true)
    }

    pub fn subfield(mut self, name: &str, declaration: Declaration) -> Self {
        self.subfields.insert(name.to_string(), declaration);
        self
    }

    pub fn variant(mut self, key: &str, schema: Schema) -> Self {
        self.structure.insert(key.to_string(), schema);
        self
    }

    pub fn conditional(mut self, logic: ConditionalLogic) -> Self {
        self.additional.conditional_logic = Some(logic);
        self
    }

    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.additional.sanitizers.push(sanitizer);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.additional.validators.push(validator);
        self
    }

    pub fn unique(mut self) -> Self {
        self.additional.unique = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.additional.immutable = true;
        self
    }

    pub fn without_population(mut self) -> Self {
        self.additional.population = Some(false);
        self
    }

    pub fn populator(mut self, population: Population) -> Self {
        self.additional.populator = Some(population);
        self
    }

    pub fn is_required(&self) -> bool {
        self.options.get("required").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Deterministic identity of the declaration's configuration, used to
    /// cache resolved options.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}{}", self.kind, Value::Object(self.options.clone()));
        if !self.subfields.is_empty() {
            key.push_str(&schema_key(&self.subfields));
        }
        for (variant, schema) in &self.structure {
            key.push_str(&format!("|{variant}{}", schema_key(schema)));
        }
        key
    }
}

fn schema_key(schema: &Schema) -> String {
    let members: Vec<String> =
        schema.iter().map(|(name, decl)| format!("{name}={}", decl.cache_key())).collect();
    format!("{{{}}}", members.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_nested_declaration() {
        let decl: Declaration = serde_json::from_value(json!({
            "type": "repeater",
            "options": { "min": 2 },
            "subfields": {
                "label": { "type": "text", "options": { "required": true } },
                "link": { "type": "record", "options": { "collection": "pages" } }
            },
            "additional": { "unique": false }
        }))
        .unwrap();

        assert_eq!(decl.kind, FieldKind::Repeater);
        assert_eq!(decl.subfields.len(), 2);
        assert!(decl.subfields["label"].is_required());
        assert_eq!(decl.subfields.keys().next().map(String::as_str), Some("label"));
    }

    #[test]
    fn test_deserialize_conditional_logic() {
        let decl: Declaration = serde_json::from_value(json!({
            "type": "text",
            "additional": { "conditional-logic": { "kind": "external" } }
        }))
        .unwrap();
        assert!(decl.additional.conditional_logic.is_some());
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = Declaration::new(FieldKind::Number).option("min", 1).option("max", 5);
        let b = Declaration::new(FieldKind::Number).option("max", 5).option("min", 1);
        assert_eq!(a.cache_key(), b.cache_key());

        let c = Declaration::new(FieldKind::Number).option("min", 2);
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_cache_key_includes_subfields() {
        let a = Declaration::new(FieldKind::Repeater)
            .subfield("x", Declaration::new(FieldKind::Text));
        let b = Declaration::new(FieldKind::Repeater)
            .subfield("x", Declaration::new(FieldKind::Number));
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
