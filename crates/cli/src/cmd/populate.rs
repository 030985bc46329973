use serde_json::Value;
use std::path::Path;

use super::output::print_json;
use super::{open_engine, read_input};
use crate::RecordArgs;

pub fn run(config: Option<&Path>, args: RecordArgs) {
    let engine = open_engine(config);
    let input = read_input(&args.input);

    let populated = match input {
        Value::Array(records) => records
            .into_iter()
            .map(|record| engine.populate_record(&args.collection, record))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        record => engine.populate_record(&args.collection, record),
    };

    match populated {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
