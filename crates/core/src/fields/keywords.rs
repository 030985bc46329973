//! Search keyword extraction.

use serde_json::Value;

use super::declaration::Declaration;
use super::definition::KeywordContext;
use super::engine::FieldEngine;
use super::errors::EngineError;
use super::path::FieldPath;
use super::walk;
use crate::schema::Collection;

/// Keywords of one field value. Composite values join the keywords of every
/// present member.
pub(crate) fn extract(
    engine: &FieldEngine,
    path: &FieldPath,
    declaration: &Declaration,
    value: &Value,
) -> Result<String, EngineError> {
    let definition = engine.definition(declaration.kind)?;

    if definition.input_meta.composite {
        let mut parts = Vec::new();
        for member in walk::members(engine.schemas(), path, declaration, value) {
            if let Some(child) = member.relative.lookup(value) {
                parts.push(extract(engine, &member.path, member.declaration, child)?);
            }
        }
        return Ok(join(parts));
    }

    let options = engine.resolve_options(path.name(), declaration)?;
    Ok((definition.extract_keywords)(value, &KeywordContext { path, definition, options: &options }))
}

/// Keywords of a record, from the collection's search fields.
pub(crate) fn record(
    engine: &FieldEngine,
    collection: &Collection,
    record: &Value,
) -> Result<String, EngineError> {
    let names: Vec<&str> = match &collection.search {
        Some(search) => search.iter().map(String::as_str).collect(),
        None => collection.fields.keys().map(String::as_str).collect(),
    };

    let mut parts = Vec::new();
    for name in names {
        let (Some(declaration), Some(value)) = (collection.fields.get(name), record.get(name)) else {
            continue;
        };
        parts.push(extract(engine, &FieldPath::root().child(name), declaration, value)?);
    }
    Ok(join(parts))
}

/// Trim every part and join the non-empty ones with single spaces.
pub fn join(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
