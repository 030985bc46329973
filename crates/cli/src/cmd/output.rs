//! Shared output formatting for record commands.

use fieldkit_core::fields::ErrorMap;
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

/// Row of the validation error table.
#[derive(Tabled)]
struct ErrorRow {
    #[tabled(rename = "Field")]
    path: String,
    #[tabled(rename = "Error")]
    message: String,
}

/// Print an error map as a table.
pub fn print_errors_table(errors: &ErrorMap) {
    let rows: Vec<ErrorRow> = errors
        .iter()
        .map(|(path, message)| ErrorRow {
            path: if path.is_empty() { "(record)".to_string() } else { path.to_string() },
            message: message.to_string(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("-- {} errors --", errors.len());
}

/// Print an error map as a JSON object keyed by field path.
pub fn print_errors_json(errors: &ErrorMap) {
    println!("{}", serde_json::to_string_pretty(errors).unwrap_or_default());
}

/// Print a record (or array of records) as pretty JSON.
pub fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}
