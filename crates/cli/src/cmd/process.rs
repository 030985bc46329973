use fieldkit_core::fields::{EngineError, ErrorMap, FieldEngine, Operation};
use serde_json::Value;
use std::path::Path;

use super::output::{print_errors_json, print_errors_table, print_json};
use super::{open_engine, read_input};
use crate::ProcessArgs;

pub fn run(config: Option<&Path>, args: ProcessArgs) {
    let engine = open_engine(config);
    let mut input = read_input(&args.record.input);
    let operation = Operation::from(args.operation);

    let errors = match process(&engine, &args.record.collection, &mut input, operation) {
        Ok(errors) => errors,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if errors.is_empty() {
        print_json(&input);
        return;
    }

    if args.json {
        print_errors_json(&errors);
    } else {
        print_errors_table(&errors);
    }
    eprintln!("validation failed for collection '{}'", args.record.collection);
    std::process::exit(2);
}

/// Arrays are processed as one batch, anything else as a single record.
fn process(
    engine: &FieldEngine,
    collection: &str,
    input: &mut Value,
    operation: Operation,
) -> Result<ErrorMap, EngineError> {
    match input {
        Value::Array(records) => engine.process_batch(collection, records, operation),
        record => engine.process_record(collection, record, operation, &[]),
    }
}
