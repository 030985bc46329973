//! `number` and `range`.

use serde_json::{Value, json};

use super::{accepts, decode_json, default_option, display_number, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    FieldOption, FieldSpec, JsType, OptionKind, Sanitizer, TypeSpec, Validator,
};
use crate::fields::errors::FieldError;
use crate::fields::options::ResolvedOptions;
use crate::fields::value::{number_value, parse_number};

fn numeric_string(value: Value) -> Value {
    match &value {
        Value::String(s) => parse_number(s).map_or(value, number_value),
        _ => value,
    }
}

fn check_bounds(n: f64, options: &ResolvedOptions) -> Result<(), FieldError> {
    if let Some(min) = options.number("min")
        && n < min
    {
        return Err(FieldError::message(format!(
            "The value must be greater than or equal to {}",
            display_number(min)
        )));
    }
    if let Some(max) = options.number("max")
        && n > max
    {
        return Err(FieldError::message(format!(
            "The value must be less than or equal to {}",
            display_number(max)
        )));
    }
    Ok(())
}

pub fn number() -> FieldSpec {
    FieldSpec::new(FieldKind::Number, TypeSpec::Shorthand(JsType::Number))
        .default(default_option)
        .option("required", required_option())
        .option("default", FieldOption::new(OptionKind::Number).default_value(json!(0)))
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .option("decimals", FieldOption::new(OptionKind::Number))
        .sanitizer(Sanitizer::new(|value, _| Ok(numeric_string(value))))
        .sanitizer(Sanitizer::new(|value, ctx| {
            let (Some(n), Some(decimals)) = (value.as_f64(), ctx.options.count("decimals")) else {
                return Ok(value);
            };
            let factor = 10f64.powi(decimals.min(15) as i32);
            Ok(number_value((n * factor).round() / factor))
        }))
        .validator(required())
        .validator(accepts(Value::is_number))
        .validator(Validator::new(|value, ctx| match value.as_f64() {
            Some(n) => check_bounds(n, ctx.options),
            None => Ok(()),
        }))
}

fn range_bounds(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [from, to] => Some((from.as_f64()?, to.as_f64()?)),
        _ => None,
    }
}

pub fn range() -> FieldSpec {
    FieldSpec::new(FieldKind::Range, TypeSpec::Shorthand(JsType::Object))
        .default(default_option)
        .option("required", required_option())
        .option("min", FieldOption::new(OptionKind::Number).default_value(json!(0)))
        .option("max", FieldOption::new(OptionKind::Number).default_value(json!(100)))
        .option("min-range", FieldOption::new(OptionKind::Number).default_value(json!(0)))
        .option(
            "max-range",
            FieldOption::new(OptionKind::Number).default_with(|ctx| {
                match (ctx.number("min"), ctx.number("max")) {
                    (Some(min), Some(max)) => number_value(max - min),
                    _ => Value::Null,
                }
            }),
        )
        .option(
            "default",
            FieldOption::new(OptionKind::Array).default_with(|ctx| {
                let bound = |name| ctx.number(name).map_or(Value::Null, number_value);
                Value::Array(vec![bound("min"), bound("max")])
            }),
        )
        .sanitizer(decode_json(Value::is_array))
        .sanitizer(Sanitizer::new(|value, _| {
            Ok(match value {
                Value::Array(items) => Value::Array(items.into_iter().map(numeric_string).collect()),
                other => other,
            })
        }))
        .validator(required())
        .validator(accepts(|value| range_bounds(value).is_some()))
        .validator(Validator::new(|value, ctx| {
            let Some((from, to)) = range_bounds(value) else { return Ok(()) };
            check_bounds(from, ctx.options)?;
            check_bounds(to, ctx.options)?;
            if from > to {
                return Err(FieldError::message("The start of the range must not exceed its end"));
            }

            let span = to - from;
            if let Some(min) = ctx.options.number("min-range")
                && span < min
            {
                return Err(FieldError::message(format!(
                    "The range must span at least {}",
                    display_number(min)
                )));
            }
            if let Some(max) = ctx.options.number("max-range")
                && span > max
            {
                return Err(FieldError::message(format!(
                    "The range must span at most {}",
                    display_number(max)
                )));
            }
            Ok(())
        }))
}
