use serde_json::Value;
use std::path::Path;

use super::{open_engine, read_input};
use crate::RecordArgs;

/// Print one line of keywords per record.
pub fn run(config: Option<&Path>, args: RecordArgs) {
    let engine = open_engine(config);
    let records = match read_input(&args.input) {
        Value::Array(records) => records,
        record => vec![record],
    };

    for record in &records {
        match engine.extract_record_keywords(&args.collection, record) {
            Ok(keywords) => println!("{keywords}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}
