//! The single traversal over composite values.
//!
//! Repeater entries, object members, structure variants, block fields and
//! block slots are all enumerated here. Sanitize, validate, populate and
//! keyword extraction differ only in what they do with each [`Member`].

use serde_json::{Map, Value};

use super::declaration::{Declaration, Schema};
use super::errors::{
    BLOCK_NOT_ALLOWED, ErrorMap, INVALID_BLOCK_NAME, INVALID_INPUT_TYPE, INVALID_STRUCTURE_KEY,
    UNRECOGNIZED_FIELD,
};
use super::kinds::FieldKind;
use super::options::ResolvedOptions;
use super::path::FieldPath;
use crate::schema::SchemaRegistry;

/// Discriminator member of structure entries.
pub const STRUCTURE_KEY: &str = "$key";

/// A nested declaration together with the location of its value.
#[derive(Debug, Clone)]
pub struct Member<'a> {
    /// Location from the root of the walk.
    pub path: FieldPath,
    /// Location inside the composite value being walked.
    pub relative: FieldPath,
    pub declaration: &'a Declaration,
}

/// Outcome of [`normalize_shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Valid,
    /// The whole field must be reset to its default.
    Invalidated,
}

/// Enumerate the nested declarations of a composite `value` found at `path`.
///
/// Members are listed whether or not their value is present, in schema
/// order. Block slot entries are followed recursively, so the members of a
/// block tree are its fields at every depth. Entries without a valid shape
/// contribute nothing.
pub fn members<'a>(
    schemas: &'a SchemaRegistry,
    path: &FieldPath,
    declaration: &'a Declaration,
    value: &Value,
) -> Vec<Member<'a>> {
    let mut walker = Walker { base: path, out: Vec::new() };
    let root = FieldPath::root();

    match declaration.kind {
        FieldKind::Repeater => {
            for (i, entry) in entries(value) {
                if entry.is_object() {
                    walker.schema(&root.index(i), &declaration.subfields);
                }
            }
        }
        FieldKind::Object => {
            if value.is_object() {
                walker.schema(&root, &declaration.subfields);
            }
        }
        FieldKind::Structure => {
            for (i, entry) in entries(value) {
                if let Some(schema) = variant(declaration, entry) {
                    walker.schema(&root.index(i), schema);
                }
            }
        }
        FieldKind::Blocks => {
            for (i, entry) in entries(value) {
                walker.block(schemas, &root.index(i), entry);
            }
        }
        _ => {}
    }

    walker.out
}

struct Walker<'a, 'p> {
    base: &'p FieldPath,
    out: Vec<Member<'a>>,
}

impl<'a> Walker<'a, '_> {
    fn schema(&mut self, at: &FieldPath, schema: &'a Schema) {
        for (name, declaration) in schema {
            let relative = at.child(name.as_str());
            self.out.push(Member { path: self.base.join(&relative), relative, declaration });
        }
    }

    fn block(&mut self, schemas: &'a SchemaRegistry, at: &FieldPath, entry: &Value) {
        let Some(block) = entry.get("name").and_then(Value::as_str).and_then(|n| schemas.block(n))
        else {
            return;
        };

        self.schema(&at.child("fields"), &block.fields);
        for slot in block.slots.keys() {
            let slot_path = at.child("slots").child(slot.as_str());
            let children = entry.get("slots").and_then(|s| s.get(slot)).and_then(Value::as_array);
            for (j, child) in children.into_iter().flatten().enumerate() {
                self.block(schemas, &slot_path.index(j), child);
            }
        }
    }
}

fn entries(value: &Value) -> impl Iterator<Item = (usize, &Value)> {
    value.as_array().into_iter().flatten().enumerate()
}

fn variant<'a>(declaration: &'a Declaration, entry: &Value) -> Option<&'a Schema> {
    entry.get(STRUCTURE_KEY).and_then(Value::as_str).and_then(|k| declaration.structure.get(k))
}

/// Bring a composite value into the shape its declaration describes.
///
/// Unrecognized members are removed, malformed entries are nulled so the
/// indices of their siblings stay stable, and every problem is recorded at
/// its own path. An unknown block name anywhere in a block tree invalidates
/// the whole field.
pub fn normalize_shape(
    schemas: &SchemaRegistry,
    path: &FieldPath,
    declaration: &Declaration,
    options: &ResolvedOptions,
    value: &mut Value,
    errors: &mut ErrorMap,
) -> Shape {
    match declaration.kind {
        FieldKind::Repeater => {
            for (i, entry) in entries_mut(value) {
                let at = path.index(i);
                if entry.is_object() {
                    prune(entry, &at, |k| declaration.subfields.contains_key(k), errors);
                } else {
                    errors.insert(&at, INVALID_INPUT_TYPE);
                    *entry = Value::Null;
                }
            }
        }
        FieldKind::Object => {
            prune(value, path, |k| declaration.subfields.contains_key(k), errors);
        }
        FieldKind::Structure => {
            for (i, entry) in entries_mut(value) {
                let at = path.index(i);
                if !entry.is_object() {
                    errors.insert(&at, INVALID_INPUT_TYPE);
                    *entry = Value::Null;
                    continue;
                }
                match variant(declaration, entry) {
                    Some(schema) => {
                        prune(entry, &at, |k| k == STRUCTURE_KEY || schema.contains_key(k), errors)
                    }
                    None => {
                        errors.insert(&at, INVALID_STRUCTURE_KEY);
                        *entry = Value::Null;
                    }
                }
            }
        }
        FieldKind::Blocks => {
            let allowed: Option<Vec<String>> = options
                .strings("allowed-blocks")
                .map(|names| names.into_iter().map(ToOwned::to_owned).collect());
            for (i, entry) in entries_mut(value) {
                if block_entry(schemas, entry, &path.index(i), allowed.as_deref(), errors).is_err() {
                    return Shape::Invalidated;
                }
            }
        }
        _ => {}
    }
    Shape::Valid
}

struct UnknownBlock;

fn block_entry(
    schemas: &SchemaRegistry,
    entry: &mut Value,
    at: &FieldPath,
    allowed: Option<&[String]>,
    errors: &mut ErrorMap,
) -> Result<(), UnknownBlock> {
    if !entry.is_object() {
        errors.insert(at, INVALID_INPUT_TYPE);
        *entry = Value::Null;
        return Ok(());
    }

    let Some(block) = entry.get("name").and_then(Value::as_str).and_then(|n| schemas.block(n))
    else {
        errors.insert(at, INVALID_BLOCK_NAME);
        return Err(UnknownBlock);
    };

    if allowed.is_some_and(|names| !names.iter().any(|n| *n == block.name)) {
        errors.insert(at, BLOCK_NOT_ALLOWED);
        *entry = Value::Null;
        return Ok(());
    }

    prune(entry, at, |k| matches!(k, "name" | "fields" | "slots"), errors);
    let Value::Object(map) = entry else {
        return Ok(());
    };

    let fields_path = at.child("fields");
    let fields = map.entry("fields").or_insert_with(|| Value::Object(Map::new()));
    if !fields.is_object() {
        errors.insert(&fields_path, INVALID_INPUT_TYPE);
        *fields = Value::Object(Map::new());
    }
    prune(fields, &fields_path, |k| block.fields.contains_key(k), errors);

    let Some(slots) = map.get_mut("slots") else {
        return Ok(());
    };
    let slots_path = at.child("slots");
    if !slots.is_object() {
        errors.insert(&slots_path, INVALID_INPUT_TYPE);
        *slots = Value::Object(Map::new());
    }
    prune(slots, &slots_path, |k| block.slots.contains_key(k), errors);

    if let Value::Object(slot_map) = slots {
        for (slot_name, children) in slot_map.iter_mut() {
            let Some(slot) = block.slots.get(slot_name) else { continue };
            let slot_path = slots_path.child(slot_name.as_str());
            match children {
                Value::Array(items) => {
                    for (j, child) in items.iter_mut().enumerate() {
                        block_entry(
                            schemas,
                            child,
                            &slot_path.index(j),
                            slot.allowed_child_blocks.as_deref(),
                            errors,
                        )?;
                    }
                }
                other => {
                    errors.insert(&slot_path, INVALID_INPUT_TYPE);
                    *other = Value::Array(Vec::new());
                }
            }
        }
    }

    Ok(())
}

fn entries_mut(value: &mut Value) -> impl Iterator<Item = (usize, &mut Value)> {
    value.as_array_mut().into_iter().flatten().enumerate()
}

/// Remove every object member `keep` rejects, recording each at its path.
fn prune(value: &mut Value, at: &FieldPath, keep: impl Fn(&str) -> bool, errors: &mut ErrorMap) {
    let Value::Object(map) = value else { return };
    let unknown: Vec<String> = map.keys().filter(|k| !keep(k)).cloned().collect();
    for key in unknown {
        map.remove(&key);
        errors.insert(&at.child(key), UNRECOGNIZED_FIELD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::options::ResolvedOptions;
    use crate::schema::{BlockDefinition, SlotDefinition};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_block(
                BlockDefinition::new("Gallery")
                    .field("title", Declaration::new(FieldKind::Text))
                    .slot("default", SlotDefinition::allowing(&["Image"])),
            )
            .unwrap()
            .with_block(BlockDefinition::new("Image").field("label", Declaration::new(FieldKind::Text)))
            .unwrap()
    }

    fn paths(members: &[Member<'_>]) -> Vec<String> {
        members.iter().map(|m| m.path.to_string()).collect()
    }

    #[test]
    fn test_repeater_members() {
        let decl = Declaration::new(FieldKind::Repeater)
            .subfield("a", Declaration::new(FieldKind::Text))
            .subfield("b", Declaration::new(FieldKind::Number));
        let value = json!([{ "a": "x" }, null, {}]);
        let registry = SchemaRegistry::new();
        let members = members(&registry, &FieldPath::parse("rows"), &decl, &value);
        assert_eq!(paths(&members), vec!["rows.0.a", "rows.0.b", "rows.2.a", "rows.2.b"]);
        assert_eq!(members[1].relative.to_string(), "0.b");
    }

    #[test]
    fn test_structure_members_follow_key() {
        let mut quote = Schema::new();
        quote.insert("text".into(), Declaration::new(FieldKind::Text));
        let mut link = Schema::new();
        link.insert("url".into(), Declaration::new(FieldKind::Text));
        let decl = Declaration::new(FieldKind::Structure).variant("quote", quote).variant("link", link);

        let value = json!([{ "$key": "link", "url": "/" }, { "$key": "quote" }]);
        let registry = SchemaRegistry::new();
        let members = members(&registry, &FieldPath::parse("parts"), &decl, &value);
        assert_eq!(paths(&members), vec!["parts.0.url", "parts.1.text"]);
    }

    #[test]
    fn test_block_members_follow_slots() {
        let schemas = registry();
        let decl = Declaration::new(FieldKind::Blocks);
        let value = json!([{
            "name": "Gallery",
            "fields": { "title": "t" },
            "slots": { "default": [{ "name": "Image" }, { "name": "Image" }] }
        }]);
        let members = members(&schemas, &FieldPath::parse("blocks"), &decl, &value);
        assert_eq!(
            paths(&members),
            vec![
                "blocks.0.fields.title",
                "blocks.0.slots.default.0.fields.label",
                "blocks.0.slots.default.1.fields.label",
            ]
        );
    }

    #[test]
    fn test_normalize_repeater() {
        let decl = Declaration::new(FieldKind::Repeater).subfield("a", Declaration::new(FieldKind::Text));
        let mut value = json!([{ "a": "x", "zzz": 1 }, "oops"]);
        let mut errors = ErrorMap::new();
        let path = FieldPath::parse("rows");
        let shape = normalize_shape(
            &SchemaRegistry::new(),
            &path,
            &decl,
            &ResolvedOptions::default(),
            &mut value,
            &mut errors,
        );

        assert_eq!(shape, Shape::Valid);
        assert_eq!(value, json!([{ "a": "x" }, null]));
        assert_eq!(errors.get("rows.0.zzz"), Some(UNRECOGNIZED_FIELD));
        assert_eq!(errors.get("rows.1"), Some(INVALID_INPUT_TYPE));
    }

    #[test]
    fn test_normalize_blocks() {
        let schemas = registry();
        let decl = Declaration::new(FieldKind::Blocks);
        let mut value = json!([{
            "name": "Gallery",
            "slots": { "default": [{ "name": "Gallery" }, { "name": "Image", "fields": { "x": 1 } }] }
        }]);
        let mut errors = ErrorMap::new();
        let shape = normalize_shape(
            &schemas,
            &FieldPath::parse("blocks"),
            &decl,
            &ResolvedOptions::default(),
            &mut value,
            &mut errors,
        );

        assert_eq!(shape, Shape::Valid);
        assert_eq!(errors.get("blocks.0.slots.default.0"), Some(BLOCK_NOT_ALLOWED));
        assert_eq!(errors.get("blocks.0.slots.default.1.fields.x"), Some(UNRECOGNIZED_FIELD));
        assert_eq!(value[0]["fields"], json!({}));
        assert_eq!(value[0]["slots"]["default"][0], Value::Null);
    }

    #[test]
    fn test_unknown_block_invalidates() {
        let schemas = registry();
        let decl = Declaration::new(FieldKind::Blocks);
        let mut value = json!([{ "name": "Gallery", "slots": { "default": [{ "name": "Video" }] } }]);
        let mut errors = ErrorMap::new();
        let shape = normalize_shape(
            &schemas,
            &FieldPath::parse("blocks"),
            &decl,
            &ResolvedOptions::default(),
            &mut value,
            &mut errors,
        );

        assert_eq!(shape, Shape::Invalidated);
        assert_eq!(errors.get("blocks.0.slots.default.0"), Some(INVALID_BLOCK_NAME));
    }
}
