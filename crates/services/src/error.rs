//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::SyllabusError;

/// A durable write failed. In-memory progress stays authoritative.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("failed to persist progress snapshot: {0}")]
    Storage(#[from] StorageError),
    #[error("snapshot writer is no longer running")]
    WriterClosed,
}

/// The remote text-generation service failed or answered with unusable data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("text generation is not configured")]
    Disabled,
    #[error("text generation returned an empty response")]
    EmptyResponse,
    #[error("text generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("text generation returned unusable data: {0}")]
    InvalidResponse(String),
}

/// Errors emitted while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a whole number, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error("unknown tick policy {0:?} (expected \"catch-up\" or \"single-step\")")]
    InvalidTickPolicy(String),
}

/// Errors emitted while loading a syllabus file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyllabusLoadError {
    #[error("cannot read syllabus file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse syllabus file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] SyllabusError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Syllabus(#[from] SyllabusLoadError),
}
