//! Error types for loading and registering schemas.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading collection and block schemas.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// Schema directory cannot be resolved.
    #[error("schema directory does not exist: {0}")]
    MissingDir(String),

    /// Error walking the schema directory.
    #[error("failed to read schema directory {0}: {1}")]
    WalkError(String, #[source] walkdir::Error),

    /// Error reading a schema file.
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a schema file.
    #[error("failed to parse schema file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Two collections or two blocks share a name.
    #[error("duplicate {kind} name: {name}")]
    Duplicate { kind: &'static str, name: String },

    /// A slot allows a block that is not registered.
    #[error("block '{block}' slot '{slot}' allows unknown block '{child}'")]
    UnknownChildBlock { block: String, slot: String, child: String },
}
