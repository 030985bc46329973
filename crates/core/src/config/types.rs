use std::path::PathBuf;

use serde::Deserialize;

use crate::fields::DEFAULT_MAX_DEPTH;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    /// Directory holding `collections/` and `blocks/`.
    pub schema_dir: String,
    /// Optional JSON fixture of stored records, keyed by collection.
    #[serde(default)]
    pub records: Option<String>,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PopulationConfig {
    /// Populator invocations allowed per field path and operation.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { max_depth: default_max_depth() }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// File the configuration was read from.
    pub source: PathBuf,
    pub schema_dir: PathBuf,
    pub records: Option<PathBuf>,
    pub population: PopulationConfig,
    pub logging: LoggingConfig,
}
