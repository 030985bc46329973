//! `repeater`, `object`, `structure` and `blocks`.
//!
//! These only check the container itself. Their members are reached through
//! [`walk`](crate::fields::walk) by every pipeline.

use serde_json::{Map, Value, json};

use super::{accepts, count_bounds, decode_json, required, required_option};
use crate::fields::FieldKind;
use crate::fields::definition::{
    DbType, FieldOption, FieldSpec, InputMeta, JsType, OptionKind, TypeSpec, ValueType,
};

const COMPOSITE: InputMeta = InputMeta { composite: true, multiple: false, required: false };
const COMPOSITE_LIST: InputMeta = InputMeta { composite: true, multiple: true, required: false };

fn list(kind: FieldKind, ts: &str) -> FieldSpec {
    FieldSpec::new(kind, TypeSpec::Full(ValueType::new(JsType::Object, ts, DbType::Text)))
        .default(|_| json!([]))
        .option("required", required_option())
        .sanitizer(decode_json(Value::is_array))
        .validator(required())
        .validator(accepts(Value::is_array))
        .input_meta(COMPOSITE_LIST)
}

pub fn repeater() -> FieldSpec {
    list(FieldKind::Repeater, "Record<string, any>[]")
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .validator(count_bounds())
}

pub fn object() -> FieldSpec {
    FieldSpec::new(FieldKind::Object, TypeSpec::Shorthand(JsType::Object))
        .default(|_| Value::Object(Map::new()))
        .option("required", required_option())
        .sanitizer(decode_json(Value::is_object))
        .validator(required())
        .validator(accepts(Value::is_object))
        .input_meta(COMPOSITE)
}

pub fn structure() -> FieldSpec {
    list(FieldKind::Structure, "({ $key: string } & Record<string, any>)[]")
        .option("min", FieldOption::new(OptionKind::Number))
        .option("max", FieldOption::new(OptionKind::Number))
        .validator(count_bounds())
}

pub fn blocks() -> FieldSpec {
    list(FieldKind::Blocks, "{ name: string, fields: Record<string, any>, slots?: Record<string, any[]> }[]")
        .option("allowed-blocks", FieldOption::new(OptionKind::Array))
}
