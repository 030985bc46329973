use fieldkit_core::config::loader::{ConfigLoader, default_config_path};
use fieldkit_core::fields::DefinitionRegistry;
use std::path::Path;

use super::load_registry;
use crate::logging;

pub fn run(config: Option<&Path>) {
    let rc = match ConfigLoader::load(config) {
        Ok(rc) => rc,
        Err(e) => {
            println!("FAIL fieldkit doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    };
    logging::init(&rc.logging);

    let registry = match load_registry(&rc) {
        Ok(registry) => registry,
        Err(e) => {
            println!("FAIL fieldkit doctor");
            println!("{e}");
            std::process::exit(1);
        }
    };

    println!("OK   fieldkit doctor");
    println!("path: {}", rc.source.display());
    println!("schema_dir: {}", rc.schema_dir.display());
    println!(
        "records: {}",
        rc.records.as_ref().map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
    );
    println!("population.max_depth: {}", rc.population.max_depth);
    println!("logging.level: {}", rc.logging.level);
    println!("field types: {}", DefinitionRegistry::builtin().len());
    println!("collections: {}", list(registry.collection_names()));
    println!("blocks: {}", list(registry.block_names()));
}

fn list(names: Vec<&str>) -> String {
    if names.is_empty() { "(none)".to_string() } else { names.join(", ") }
}
