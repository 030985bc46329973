pub mod config;
pub mod fields;
pub mod query;
pub mod schema;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
