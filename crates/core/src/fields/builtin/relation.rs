//! `record` and `records`: references to other collections.
//!
//! Casted values are positive integer ids. Population fetches the related
//! records through the query capability, selecting the `fields` option plus
//! `id`; with `populate: true` the fetched records are populated in turn.

use serde_json::{Value, json};

use super::{accepts, count_bounds, decode_json, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    DbType, FieldOption, FieldSpec, JsType, OptionKind, Population, Sanitizer, TypeSpec,
    Validator, ValueType,
};
use crate::fields::errors::{FieldError, FieldResult};
use crate::fields::populate::PopulateContext;
use crate::fields::value::as_id;
use crate::query::QueryBuilder;

pub const RECORD_NOT_FOUND: &str = "The referenced record does not exist";
pub const DUPLICATE_RECORDS: &str = "The same record is referenced more than once";

const ID: &str = "id";

/// Numeric strings and `{ "id": .. }` objects become ids.
fn to_id(value: Value) -> Value {
    match value {
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(id) => Value::from(id),
            Err(_) => Value::String(s),
        },
        Value::Object(mut map) => match map.remove(ID) {
            Some(id) => to_id(id),
            None => Value::Object(map),
        },
        other => other,
    }
}

fn is_id_list(value: &Value) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(|item| as_id(item).is_some()))
}

fn relation_options(spec: FieldSpec) -> FieldSpec {
    spec.option("required", required_option())
        .option("collection", FieldOption::new(OptionKind::String).required())
        .option("fields", FieldOption::new(OptionKind::Array).default_value(json!([ID])))
        .option("populate", FieldOption::new(OptionKind::Boolean).default_value(json!(false)))
}

/// Builder over the related collection, carrying the selection and the
/// populate flag.
fn related(ctx: &PopulateContext<'_>) -> FieldResult<QueryBuilder> {
    let query = ctx.query().ok_or_else(|| FieldError::message("no query capability"))?;
    let collection = ctx
        .options
        .str("collection")
        .ok_or_else(|| FieldError::message("relation without a collection"))?;

    let mut fields: Vec<String> =
        ctx.options.strings("fields").unwrap_or_default().into_iter().map(String::from).collect();
    if !fields.iter().any(|f| f == ID) {
        fields.insert(0, ID.to_string());
    }
    Ok(query.query(collection).select(fields).populate(ctx.options.bool("populate")))
}

fn finish(ctx: &PopulateContext<'_>, builder: &QueryBuilder, record: Value) -> FieldResult<Value> {
    if !builder.is_populated() {
        return Ok(record);
    }
    ctx.populate_record(&builder.request().collection, record)
        .map_err(|err| FieldError::from(Box::new(err)))
}

pub fn record() -> FieldSpec {
    let casted = ValueType::new(JsType::Number, "number | null", DbType::Integer);
    let populated = ValueType::new(JsType::Object, "Record<string, any> | null", DbType::Text);

    relation_options(FieldSpec::new(FieldKind::Record, TypeSpec::Full(casted)))
        .sanitizer(Sanitizer::new(|value, _| Ok(to_id(value))))
        .validator(required())
        .validator(accepts(|value| as_id(value).is_some()))
        .validator(Validator::new(|value, ctx| {
            let (Some(id), Some(query), Some(collection)) =
                (as_id(value), ctx.query, ctx.options.str("collection"))
            else {
                return Ok(());
            };
            if query.query(collection).where_eq(ID, id).exists()? {
                Ok(())
            } else {
                Err(FieldError::message(RECORD_NOT_FOUND))
            }
        }))
        .population(Population::new(populated, Value::Null, |value, ctx| {
            let Some(id) = as_id(&value) else { return Ok(Value::Null) };
            let builder = related(ctx)?.where_eq(ID, id);
            match builder.clone().first()? {
                Some(record) => finish(ctx, &builder, record),
                None => Ok(Value::Null),
            }
        }))
}

pub fn records() -> FieldSpec {
    let casted = ValueType::new(JsType::Object, "number[]", DbType::Text);
    let populated = ValueType::new(JsType::Object, "Record<string, any>[]", DbType::Text);

    relation_options(FieldSpec::new(FieldKind::Records, TypeSpec::Full(casted)))
        .default(|_| json!([]))
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .sanitizer(decode_json(Value::is_array))
        .sanitizer(Sanitizer::new(|value, _| {
            Ok(match value {
                Value::Array(items) => Value::Array(items.into_iter().map(to_id).collect()),
                other => other,
            })
        }))
        .validator(required())
        .validator(accepts(is_id_list))
        .validator(Validator::new(|value, _| {
            let ids: Vec<u64> = value.as_array().into_iter().flatten().filter_map(as_id).collect();
            let mut seen = std::collections::HashSet::new();
            if ids.iter().all(|id| seen.insert(*id)) {
                Ok(())
            } else {
                Err(FieldError::message(DUPLICATE_RECORDS))
            }
        }))
        .validator(count_bounds())
        .validator(Validator::new(|value, ctx| {
            let ids: Vec<Value> =
                value.as_array().into_iter().flatten().filter(|v| as_id(v).is_some()).cloned().collect();
            let (Some(query), Some(collection)) = (ctx.query, ctx.options.str("collection")) else {
                return Ok(());
            };
            if ids.is_empty() {
                return Ok(());
            }
            let expected = ids.len();
            if query.query(collection).where_in(ID, ids).count()? == expected {
                Ok(())
            } else {
                Err(FieldError::message(RECORD_NOT_FOUND))
            }
        }))
        .codec(serialize_ids, deserialize_ids)
        .population(Population::new(populated, json!([]), |value, ctx| {
            let ids: Vec<u64> = value.as_array().into_iter().flatten().filter_map(as_id).collect();
            if ids.is_empty() {
                return Ok(json!([]));
            }

            let builder = related(ctx)?.where_in(ID, ids.iter().map(|id| Value::from(*id)).collect());
            let fetched = builder.clone().all()?;

            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let found = fetched.iter().find(|record| record.get(ID).and_then(as_id) == Some(id));
                if let Some(record) = found {
                    out.push(finish(ctx, &builder, record.clone())?);
                }
            }
            Ok(Value::Array(out))
        }))
}

/// Storage form of an id list: a JSON string of string ids.
pub fn serialize_ids(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let ids: Vec<Value> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(s.clone()),
                    other => Value::String(other.to_string()),
                })
                .collect();
            Value::String(Value::Array(ids).to_string())
        }
        other => other.clone(),
    }
}

/// Inverse of [`serialize_ids`].
pub fn deserialize_ids(value: &Value) -> Value {
    let Value::String(s) = value else { return value.clone() };
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Array(items)) => Value::Array(items.into_iter().map(to_id).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_id() {
        assert_eq!(to_id(json!("12")), json!(12));
        assert_eq!(to_id(json!({ "id": "7", "title": "x" })), json!(7));
        assert_eq!(to_id(json!("abc")), json!("abc"));
        assert_eq!(to_id(json!({ "title": "x" })), json!({ "title": "x" }));
    }

    #[test]
    fn test_id_codec() {
        let stored = serialize_ids(&json!([1, 2, 3]));
        assert_eq!(stored, json!("[\"1\",\"2\",\"3\"]"));
        assert_eq!(deserialize_ids(&stored), json!([1, 2, 3]));
        assert_eq!(deserialize_ids(&json!("not json")), json!("not json"));
    }
}
