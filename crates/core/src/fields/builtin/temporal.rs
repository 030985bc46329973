//! `date`, `time` and `date-time`.
//!
//! All three store integers: dates and date-times as Unix milliseconds,
//! times as milliseconds since midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike};
use serde_json::{Value, json};

use super::{accepts, default_option, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    FieldOption, FieldSpec, JsType, KeywordContext, OptionKind, Sanitizer, TypeSpec, Validator,
};
use crate::fields::errors::FieldError;
use crate::fields::value::parse_number;

/// Last millisecond of a day.
pub const MAX_TIME_OF_DAY: i64 = 86_399_999;

fn integer(value: &Value) -> bool {
    value.as_i64().is_some()
}

fn numeric_millis(s: &str) -> Option<i64> {
    parse_number(s).filter(|n| n.fract() == 0.0).map(|n| n as i64)
}

pub fn parse_date(s: &str) -> Option<i64> {
    let s = s.trim();
    numeric_millis(s)
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis()))
}

pub fn parse_time(s: &str) -> Option<i64> {
    let s = s.trim();
    numeric_millis(s).or_else(|| {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .ok()
            .map(|t| i64::from(t.num_seconds_from_midnight()) * 1000 + i64::from(t.nanosecond() / 1_000_000))
    })
}

pub fn parse_date_time(s: &str) -> Option<i64> {
    let s = s.trim();
    numeric_millis(s)
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.and_utc().timestamp_millis())
        })
}

fn format_date(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn format_time(ms: i64) -> Option<String> {
    let secs = u32::try_from(ms.div_euclid(1000)).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).map(|t| t.format("%H:%M:%S").to_string())
}

fn format_date_time(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parsing_sanitizer(parse: fn(&str) -> Option<i64>) -> Sanitizer {
    Sanitizer::new(move |value, _| {
        Ok(match value {
            Value::String(s) => parse(&s).map_or(Value::String(s), Value::from),
            other => other,
        })
    })
}

/// Bound a millisecond value by the `min` and `max` options, rendering the
/// limit with `format` in messages.
fn bounds(format: fn(i64) -> Option<String>) -> Validator {
    Validator::new(move |value, ctx| {
        let Some(ms) = value.as_i64() else { return Ok(()) };
        let limit = |name: &str| ctx.options.get(name).as_i64();
        let render = |limit: i64| format(limit).unwrap_or_else(|| limit.to_string());

        if let Some(min) = limit("min")
            && ms < min
        {
            return Err(FieldError::message(format!("The value must not be before {}", render(min))));
        }
        if let Some(max) = limit("max")
            && ms > max
        {
            return Err(FieldError::message(format!("The value must not be after {}", render(max))));
        }
        Ok(())
    })
}

fn keywords(format: fn(i64) -> Option<String>) -> impl Fn(&Value, &KeywordContext<'_>) -> String {
    move |value, _| value.as_i64().and_then(format).unwrap_or_default()
}

fn temporal(kind: FieldKind) -> FieldSpec {
    FieldSpec::new(kind, TypeSpec::Shorthand(JsType::Number))
        .default(default_option)
        .option("required", required_option())
        .option("default", FieldOption::new(OptionKind::Number))
}

pub fn date() -> FieldSpec {
    temporal(FieldKind::Date)
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .sanitizer(parsing_sanitizer(parse_date))
        .validator(required())
        .validator(accepts(integer))
        .validator(bounds(format_date))
        .extract_keywords(keywords(format_date))
}

pub fn time() -> FieldSpec {
    temporal(FieldKind::Time)
        .option("min", FieldOption::new(OptionKind::Number).default_value(json!(0)))
        .option("max", FieldOption::new(OptionKind::Number).default_value(json!(MAX_TIME_OF_DAY)))
        .sanitizer(parsing_sanitizer(parse_time))
        .validator(required())
        .validator(accepts(integer))
        .validator(bounds(format_time))
        .extract_keywords(keywords(format_time))
}

pub fn date_time() -> FieldSpec {
    temporal(FieldKind::DateTime)
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .sanitizer(parsing_sanitizer(parse_date_time))
        .validator(required())
        .validator(accepts(integer))
        .validator(bounds(format_date_time))
        .extract_keywords(keywords(format_date_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-03-01", Some(1_709_251_200_000))]
    #[case("2024-03-01T00:00:00Z", Some(1_709_251_200_000))]
    #[case("1709251200000", Some(1_709_251_200_000))]
    #[case("March 1st", None)]
    fn test_parse_date(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_date(input), expected);
    }

    #[rstest]
    #[case("00:00", Some(0))]
    #[case("01:30", Some(5_400_000))]
    #[case("23:59:59", Some(86_399_000))]
    #[case("25:00", None)]
    fn test_parse_time(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_time(input), expected);
    }

    #[test]
    fn test_parse_date_time() {
        assert_eq!(parse_date_time("2024-03-01 12:00:00"), Some(1_709_294_400_000));
        assert_eq!(parse_date_time("2024-03-01T13:00:00+01:00"), Some(1_709_294_400_000));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_date(1_709_251_200_000).as_deref(), Some("2024-03-01"));
        assert_eq!(format_time(5_400_000).as_deref(), Some("01:30:00"));
        assert_eq!(format_date_time(1_709_294_400_000).as_deref(), Some("2024-03-01T12:00:00Z"));
    }
}
