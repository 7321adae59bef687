//! Pre-run snapshot of the store.
//!
//! The store file is copied into a private scratch directory, compressed into
//! a timestamped zip archive inside the backup directory, and the scratch
//! directory is removed whatever happens. Archives are never read back or
//! pruned; restoring one is a manual operation.
//!
//! A failed backup does not stop the run. [`backup`] logs the failure at warn
//! level and returns [`BackupOutcome::Failed`] so it shows up in the summary.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::io::{FILE_TIMESTAMP_FORMAT, create_unique_file};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("store path has no file name: {0}")]
    InvalidStorePath(PathBuf),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(PathBuf),
    /// No store existed yet, so there was nothing to protect.
    Skipped,
    Failed(String),
}

/// Back up `store_path` into `backup_dir`, logging the result.
pub fn backup(store_path: &Path, backup_dir: &Path) -> BackupOutcome {
    match backup_store(store_path, backup_dir, Local::now()) {
        Ok(Some(archive)) => {
            info!("created compressed backup: {}", archive.display());
            BackupOutcome::Created(archive)
        }
        Ok(None) => {
            info!(
                "no existing store at {}, backup skipped",
                store_path.display()
            );
            BackupOutcome::Skipped
        }
        Err(e) => {
            warn!("backup of {} failed: {}", store_path.display(), e);
            BackupOutcome::Failed(e.to_string())
        }
    }
}

/// Returns `Ok(None)` when the store does not exist yet.
pub fn backup_store(
    store_path: &Path,
    backup_dir: &Path,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>, BackupError> {
    if !store_path.is_file() {
        return Ok(None);
    }
    let file_name = store_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| BackupError::InvalidStorePath(store_path.to_path_buf()))?;
    let stem = file_name.split('.').next().unwrap_or(&file_name).to_string();

    fs::create_dir_all(backup_dir)?;
    let scratch = tempfile::Builder::new()
        .prefix(".scratch-")
        .tempdir_in(backup_dir)?;
    let copy = scratch.path().join(&file_name);
    fs::copy(store_path, &copy)?;

    let base = format!("{}_backup_{}", stem, now.format(FILE_TIMESTAMP_FORMAT));
    let (archive_path, archive) = create_unique_file(backup_dir, &base, "zip")?;
    if let Err(e) = write_archive(archive, &copy, &file_name) {
        let _ = fs::remove_file(&archive_path);
        return Err(e);
    }

    if let Err(e) = scratch.close() {
        warn!("could not remove backup scratch directory: {}", e);
    }
    Ok(Some(archive_path))
}

fn write_archive(archive: File, source: &Path, entry_name: &str) -> Result<(), BackupError> {
    let mut zip = ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name.to_string(), options)?;
    let mut src = File::open(source)?;
    io::copy(&mut src, &mut zip)?;
    let archive = zip.finish()?;
    archive.sync_all()?;
    Ok(())
}
