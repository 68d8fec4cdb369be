//! Error types for the editor

use std::path::PathBuf;
use thiserror::Error;
use trellis_livetree::LiveTreeError;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Preview error: {0}")]
    Preview(#[from] LiveTreeError),

    #[error("Surface '{0}' is not registered")]
    UnknownSurface(String),

    #[error("Surface '{0}' is already registered")]
    SurfaceExists(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
