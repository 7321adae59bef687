use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that stop a run. Rejected lines and failed backups are not errors
/// at this level; they are counted and logged by the pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not commit line {line:?} to the store: {source}")]
    StoreWriteFailure {
        line: String,
        #[source]
        source: StoreError,
    },
    #[error("line {line:?} was stored but could not be written to the report: {source}")]
    ReportWriteFailure {
        line: String,
        #[source]
        source: io::Error,
    },
    #[error("store {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl IngestError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, IngestError::Configuration(_))
    }
}
