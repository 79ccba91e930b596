//! Error types for Heurist to RO-Crate conversion

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid value function '{0}' in configuration")]
    UnknownValueFunction(String),

    #[error("Invalid RO-Crate document: {0}")]
    InvalidDocument(String),

    #[error("Invalid namespace base '{base}': {reason}")]
    InvalidNamespace { base: String, reason: String },

    #[error("Failed to load {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("Uploaded file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Uploaded file name '{0}' is not a plain file name")]
    UnsafeFileName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
