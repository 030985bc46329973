use crate::config::types::{ConfigFile, LoggingConfig, ResolvedConfig};
use shellexpand::full;
use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::home_dir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,

    #[error("population.max_depth must be at least 1")]
    InvalidDepth,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(config_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let s = fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;

        let cf: ConfigFile = toml::from_str(&s)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

        Self::resolve(&path, cf)
    }

    /// Validate a parsed file and expand its paths. Relative paths are taken
    /// relative to the directory of the config file.
    fn resolve(path: &Path, cf: ConfigFile) -> Result<ResolvedConfig, ConfigError> {
        if cf.version != 1 {
            return Err(ConfigError::BadVersion(cf.version));
        }
        if cf.population.max_depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let schema_dir = expand_path(&cf.schema_dir, base)?;
        let records = cf.records.as_deref().map(|r| expand_path(r, base)).transpose()?;

        let logging = match &cf.logging.file {
            Some(file) => LoggingConfig {
                file: Some(expand_path(&file.to_string_lossy(), base)?),
                ..cf.logging.clone()
            },
            None => cf.logging.clone(),
        };

        Ok(ResolvedConfig {
            source: path.to_path_buf(),
            schema_dir,
            records,
            population: cf.population,
            logging,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("fieldkit").join("config.toml");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("fieldkit").join("config.toml")
}

fn expand_path(input: &str, base: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = PathBuf::from(full(input).map_err(|_| ConfigError::NoHome)?.to_string());
    if expanded.is_relative() {
        return Ok(base.join(expanded));
    }
    Ok(expanded)
}
