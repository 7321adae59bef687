//! Run configuration passed explicitly into the library.
use std::path::PathBuf;

use crate::error::IngestError;
use crate::io::DEFAULT_MMAP_THRESHOLD_BYTES;
use crate::shape::RecordShape;

pub const DEFAULT_BACKUP_DIR: &str = "backups";
pub const DEFAULT_REPORT_DIR: &str = ".";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub shape: RecordShape,
    pub input: PathBuf,
    pub store_path: PathBuf,
    pub backup_dir: PathBuf,
    pub report_dir: PathBuf,
    /// Inputs at least this large are read through mmap.
    pub mmap_threshold: u64,
}

impl IngestConfig {
    /// Defaults: the shape's store file in the working directory, `backups/`
    /// for archives, reports in the working directory.
    pub fn new(shape: RecordShape, input: impl Into<PathBuf>) -> Self {
        Self {
            shape,
            input: input.into(),
            store_path: PathBuf::from(shape.default_store_file()),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if !self.input.exists() {
            return Err(IngestError::Configuration(format!(
                "input file not found: {}",
                self.input.display()
            )));
        }
        if !self.input.is_file() {
            return Err(IngestError::Configuration(format!(
                "input is not a regular file: {}",
                self.input.display()
            )));
        }
        if self.store_path.is_dir() {
            return Err(IngestError::Configuration(format!(
                "store path is a directory: {}",
                self.store_path.display()
            )));
        }
        Ok(())
    }
}
