//! Operational log: `env_logger` records, timestamped, appended to
//! `<log dir>/leakdb.log` and echoed to stderr unless quiet.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Target, WriteStyle};
use log::LevelFilter;

pub const LOG_FILE_NAME: &str = "leakdb.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub verbosity: u8,
    /// Write to the log file only.
    pub quiet: bool,
}

impl LogConfig {
    pub fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }
}

/// Writer handed to `env_logger`: every record goes to the log file and,
/// optionally, to stderr.
pub struct LogTee {
    file: File,
    echo: bool,
}

impl LogTee {
    pub fn open(path: &Path, echo: bool) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file, echo })
    }
}

impl Write for LogTee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.echo {
            // stderr is best effort; the file is the record
            let _ = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.echo {
            let _ = io::stderr().flush();
        }
        Ok(())
    }
}

pub fn init(config: &LogConfig) -> Result<()> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("create log directory {}", config.dir.display()))?;
    let path = config.file_path();
    let tee = LogTee::open(&path, !config.quiet)
        .with_context(|| format!("open log file {}", path.display()))?;
    let _ = env_logger::Builder::from_default_env()
        .filter_level(config.level())
        .format_timestamp_secs()
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(tee)))
        .try_init();
    Ok(())
}
