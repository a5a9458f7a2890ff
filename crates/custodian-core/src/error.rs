use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustodianError {
    #[error("Module file not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Failed to parse module file {origin}: {source}")]
    ManifestParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid module identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Version resolution failed: {0}")]
    VersionResolution(String),

    #[error("Failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to check out commit {commit}: {source}")]
    Checkout {
        commit: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to write module cache entry {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Dependency module not found: {0}")]
    TreeModuleNotFound(String),

    #[error("Not found: {0}")]
    ImportPathNotFound(String),

    #[error("Transformer failed for {location}: {message}")]
    TransformerFailed { location: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CustodianError>;
