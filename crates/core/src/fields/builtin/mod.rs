//! Built-in field types.
//!
//! Every kind of [`FieldKind`](super::FieldKind) has exactly one spec here.
//! Helpers shared by several kinds live in this module.

mod choice;
mod composite;
mod number;
mod relation;
mod temporal;
mod text;

use serde_json::Value;

use super::definition::{DefaultContext, FieldOption, FieldSpec, OptionKind, Sanitizer, Validator};
use super::errors::{FieldError, INVALID_INPUT_TYPE, REQUIRED};
use super::value::{decode_json_string, is_empty, number_value};

pub use relation::{RECORD_NOT_FOUND, deserialize_ids, serialize_ids};

/// Specs of every built-in field type, in `FieldKind::ALL` order.
pub fn specs() -> Vec<FieldSpec> {
    vec![
        text::text(),
        text::slug(),
        number::number(),
        number::range(),
        choice::checkbox(),
        choice::select(),
        choice::chips(),
        temporal::date(),
        temporal::time(),
        temporal::date_time(),
        relation::record(),
        relation::records(),
        composite::repeater(),
        composite::object(),
        composite::structure(),
        composite::blocks(),
    ]
}

fn required_option() -> FieldOption {
    FieldOption::new(OptionKind::Boolean).default_value(Value::Bool(false))
}

/// Definition default read from the resolved `default` option.
fn default_option(ctx: &DefaultContext<'_>) -> Value {
    ctx.options.get("default").clone()
}

fn required() -> Validator {
    Validator::new(|value, ctx| {
        if ctx.options.bool("required") && is_empty(value) {
            return Err(FieldError::message(REQUIRED));
        }
        Ok(())
    })
}

/// Reject non-null values `check` does not accept.
fn accepts(check: fn(&Value) -> bool) -> Validator {
    Validator::new(move |value, _| {
        if value.is_null() || check(value) {
            Ok(())
        } else {
            Err(FieldError::message(INVALID_INPUT_TYPE))
        }
    })
}

/// Decode JSON-encoded strings whose decoded form `accept`s.
fn decode_json(accept: fn(&Value) -> bool) -> Sanitizer {
    Sanitizer::new(move |value, _| Ok(decode_json_string(value, accept)))
}

/// Entry count within the `min` and `max` options.
fn count_bounds() -> Validator {
    Validator::new(|value, ctx| {
        let Some(items) = value.as_array() else { return Ok(()) };
        if let Some(min) = ctx.options.count("min")
            && items.len() < min
        {
            return Err(FieldError::message(format!("At least {min} entries are required")));
        }
        if let Some(max) = ctx.options.count("max")
            && items.len() > max
        {
            return Err(FieldError::message(format!("At most {max} entries are allowed")));
        }
        Ok(())
    })
}

fn display_number(n: f64) -> String {
    number_value(n).to_string()
}

fn is_string_array(value: &Value) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(Value::is_string))
}
