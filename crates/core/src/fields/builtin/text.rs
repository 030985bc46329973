//! `text` and `slug`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use super::{accepts, default_option, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    FieldOption, FieldSpec, JsType, OptionKind, Sanitizer, TypeSpec, Validator,
};
use crate::fields::errors::FieldError;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

static SLUG_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid regex"));

pub const INVALID_SLUG: &str = "Only lowercase letters, digits and single dashes are allowed";

pub fn text() -> FieldSpec {
    FieldSpec::new(FieldKind::Text, TypeSpec::Shorthand(JsType::String))
        .default(default_option)
        .option("required", required_option())
        .option("default", FieldOption::new(OptionKind::String).default_value(json!("")))
        .option("trim", FieldOption::new(OptionKind::Boolean).default_value(json!(true)))
        .option("min-length", FieldOption::new(OptionKind::Number))
        .option("max-length", FieldOption::new(OptionKind::Number))
        .sanitizer(Sanitizer::new(|value, _| {
            Ok(match value {
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            })
        }))
        .sanitizer(Sanitizer::new(|value, ctx| {
            Ok(match value {
                Value::String(s) if ctx.options.bool("trim") => Value::String(s.trim().to_string()),
                other => other,
            })
        }))
        .validator(required())
        .validator(accepts(Value::is_string))
        .validator(Validator::new(|value, ctx| {
            let Some(s) = value.as_str() else { return Ok(()) };
            let len = s.chars().count();
            if let Some(min) = ctx.options.count("min-length")
                && len < min
            {
                return Err(FieldError::message(format!(
                    "The value must be at least {min} characters long"
                )));
            }
            if let Some(max) = ctx.options.count("max-length")
                && len > max
            {
                return Err(FieldError::message(format!(
                    "The value must be at most {max} characters long"
                )));
            }
            Ok(())
        }))
}

/// Lowercase, trim and collapse whitespace, underscores and dashes into
/// single dashes.
pub fn slugify(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    SLUG_SEPARATOR_RE.replace_all(&lowered, "-").trim_matches('-').to_string()
}

pub fn slug() -> FieldSpec {
    FieldSpec::new(FieldKind::Slug, TypeSpec::Shorthand(JsType::String))
        .default(default_option)
        .option("required", required_option())
        .option("default", FieldOption::new(OptionKind::String).default_value(json!("")))
        .sanitizer(Sanitizer::new(|value, _| {
            Ok(match value {
                Value::String(s) => Value::String(slugify(&s)),
                other => other,
            })
        }))
        .validator(required())
        .validator(accepts(Value::is_string))
        .validator(Validator::new(|value, _| match value.as_str() {
            Some(s) if !s.is_empty() && !SLUG_RE.is_match(s) => {
                Err(FieldError::message(INVALID_SLUG))
            }
            _ => Ok(()),
        }))
}
