//! Report sink: the per-run file listing lines newly inserted into the store.
//!
//! - `ReportWriter::create` opens `leaks_to_report-<timestamp>.txt` without
//!   overwriting an earlier report.
//! - `ReportWriter::append` writes one line and flushes it, so the file is a
//!   truthful prefix of the run's accepted lines at every moment.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::io::{FILE_TIMESTAMP_FORMAT, create_unique_file};

pub const REPORT_PREFIX: &str = "leaks_to_report";

pub struct ReportWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ReportWriter {
    pub fn create(dir: &Path, now: DateTime<Local>) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let base = format!("{}-{}", REPORT_PREFIX, now.format(FILE_TIMESTAMP_FORMAT));
        let (path, file) = create_unique_file(dir, &base, "txt")?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    /// Wrap an already open file, e.g. one that refuses writes.
    #[cfg(test)]
    pub(crate) fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            out: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    /// Flush, sync and close; returns the report path.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.path)
    }
}
