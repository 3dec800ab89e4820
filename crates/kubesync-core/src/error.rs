//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("Invalid manifest {source_name} (document {index}): {message}")]
    InvalidManifest {
        source_name: String,
        index: usize,
        message: String,
    },

    #[error("Invalid object: {message}")]
    InvalidObject { message: String },

    #[error("Invalid server version '{major}.{minor}'")]
    InvalidVersion { major: String, minor: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
