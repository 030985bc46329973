pub mod doctor;
pub mod keywords;
pub mod output;
pub mod populate;
pub mod process;

use fieldkit_core::config::loader::ConfigLoader;
use fieldkit_core::config::types::ResolvedConfig;
use fieldkit_core::fields::FieldEngine;
use fieldkit_core::query::{MemorySource, QueryCapability};
use fieldkit_core::schema::{SchemaRegistry, SchemaRepository};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::logging;

/// Load config, start logging and build an engine, exiting on failure.
pub fn open_engine(config: Option<&Path>) -> FieldEngine {
    let rc = match ConfigLoader::load(config) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&rc.logging);

    match build_engine(&rc) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn load_registry(rc: &ResolvedConfig) -> Result<SchemaRegistry, String> {
    let repo = SchemaRepository::new(&rc.schema_dir).map_err(|e| e.to_string())?;
    SchemaRegistry::from_repository(&repo).map_err(|e| e.to_string())
}

pub fn build_engine(rc: &ResolvedConfig) -> Result<FieldEngine, String> {
    let registry = load_registry(rc)?;

    let source = match &rc.records {
        Some(path) => MemorySource::from_json(read_json(path)?).map_err(|e| e.to_string())?,
        None => MemorySource::new(),
    };

    Ok(FieldEngine::new(Arc::new(registry))
        .with_query(QueryCapability::new(Arc::new(source)))
        .with_max_depth(rc.population.max_depth))
}

pub fn read_json(path: &Path) -> Result<Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid JSON in {}: {e}", path.display()))
}

/// Read a command input, exiting on failure.
pub fn read_input(path: &Path) -> Value {
    read_json(path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}
