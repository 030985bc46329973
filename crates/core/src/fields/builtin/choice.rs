//! `checkbox`, `select` and `chips`.

use std::collections::HashSet;

use serde_json::{Value, json};

use super::{accepts, decode_json, default_option, is_string_array, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    FieldOption, FieldSpec, InputMeta, JsType, OptionKind, Sanitizer, TypeSpec, Validator,
};
use crate::fields::errors::FieldError;

pub const INVALID_CHOICE: &str = "Invalid choice";
pub const DUPLICATE_VALUES: &str = "Duplicate values are not allowed";

pub fn checkbox() -> FieldSpec {
    FieldSpec::new(FieldKind::Checkbox, TypeSpec::Shorthand(JsType::Boolean))
        .default(default_option)
        .option("default", FieldOption::new(OptionKind::Boolean).default_value(json!(false)))
        .sanitizer(Sanitizer::new(|value, _| {
            let flag = match &value {
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => None,
                },
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                },
                _ => None,
            };
            Ok(flag.map_or(value, Value::Bool))
        }))
        .validator(accepts(Value::is_boolean))
        .extract_keywords(|_, _| String::new())
}

pub fn select() -> FieldSpec {
    FieldSpec::new(FieldKind::Select, TypeSpec::Shorthand(JsType::String))
        .default(default_option)
        .option("required", required_option())
        .option("choices", FieldOption::new(OptionKind::Object).required())
        .option("default", FieldOption::new(OptionKind::String))
        .sanitizer(Sanitizer::new(|value, _| {
            Ok(match value {
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            })
        }))
        .validator(required())
        .validator(Validator::new(|value, ctx| match value {
            Value::Null => Ok(()),
            Value::String(key) if ctx.options.get("choices").get(key).is_some() => Ok(()),
            _ => Err(FieldError::message(INVALID_CHOICE)),
        }))
        .extract_keywords(|value, ctx| {
            value
                .as_str()
                .and_then(|key| ctx.options.get("choices").get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
}

pub fn chips() -> FieldSpec {
    FieldSpec::new(FieldKind::Chips, TypeSpec::Shorthand(JsType::Object))
        .default(default_option)
        .option("required", required_option())
        .option("choices", FieldOption::new(OptionKind::Array))
        .option("allow-duplicates", FieldOption::new(OptionKind::Boolean).default_value(json!(false)))
        .option("max-items", FieldOption::new(OptionKind::Number))
        .option("default", FieldOption::new(OptionKind::Array).default_value(json!([])))
        .sanitizer(decode_json(Value::is_array))
        .validator(required())
        .validator(accepts(is_string_array))
        .validator(Validator::new(|value, ctx| {
            let Some(items) = value.as_array() else { return Ok(()) };
            let chips: Vec<&str> = items.iter().filter_map(Value::as_str).collect();

            if !ctx.options.bool("allow-duplicates") {
                let mut seen = HashSet::new();
                if !chips.iter().all(|chip| seen.insert(*chip)) {
                    return Err(FieldError::message(DUPLICATE_VALUES));
                }
            }
            if let Some(choices) = ctx.options.strings("choices")
                && chips.iter().any(|chip| !choices.contains(chip))
            {
                return Err(FieldError::message(INVALID_CHOICE));
            }
            if let Some(max) = ctx.options.count("max-items")
                && chips.len() > max
            {
                return Err(FieldError::message(format!("At most {max} items are allowed")));
            }
            Ok(())
        }))
        .extract_keywords(|value, _| {
            value
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "))
                .unwrap_or_default()
        })
        .input_meta(InputMeta { multiple: true, ..InputMeta::default() })
}
