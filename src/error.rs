use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MergeError {
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("ambiguous cluster name {name}: matches {matches:?}")]
    AmbiguousCluster { name: String, matches: Vec<String> },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unrecognized sample metadata layout in {0}")]
    MetadataDialect(PathBuf),

    #[error("missing column {column:?} in {file}")]
    MissingColumn { file: PathBuf, column: String },

    #[error("malformed table {file}: {reason}")]
    MalformedTable { file: PathBuf, reason: String },

    #[error("failed to read sample manifest at {0}")]
    Manifest(PathBuf),

    #[error("failed to read translation table at {0}")]
    TranslationTable(PathBuf),

    #[error("per-sample normalization failed: {0}")]
    Normalization(String),

    #[error("batch correction ({procedure}) failed: {message}")]
    Correction { procedure: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl MergeError {
    pub fn fs(err: impl std::fmt::Display) -> Self {
        MergeError::Filesystem(err.to_string())
    }
}
