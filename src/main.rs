//! CLI entrypoint for `leakdb`.
//!
//! Parses command-line arguments, selects the record shape, sets up the
//! operational log, runs one ingestion through the library engine and prints
//! a terminal summary.
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgGroup, Parser, ValueEnum};
use colored::Colorize;
use leakdb::{
    config::{DEFAULT_BACKUP_DIR, DEFAULT_REPORT_DIR, IngestConfig},
    engine::run,
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    logging::{self, LogConfig},
    report::render_summary,
    shape::RecordShape,
};
use log::error;

#[derive(Parser, Debug)]
#[command(
    name = "leakdb",
    version,
    about = "Deduplicating credential leak ingester"
)]
#[command(group(ArgGroup::new("shape").required(true).args(["combolist", "infostealer"])))]
struct Args {
    /// Process a combolist file (user:pass lines)
    #[arg(long = "combolist")]
    combolist: bool,

    /// Process an infostealer file (url,user,pass lines)
    #[arg(long = "infostealer")]
    infostealer: bool,

    /// Path to the input file
    file_path: PathBuf,

    /// Path to the store (defaults to the shape's store file)
    #[arg(long = "db")]
    db: Option<PathBuf>,

    /// Directory for pre-run backups
    #[arg(long = "backup-dir", default_value = DEFAULT_BACKUP_DIR)]
    backup_dir: PathBuf,

    /// Directory for the new-leaks report
    #[arg(long = "report-dir", default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,

    /// Directory for the operational log
    #[arg(long = "log-dir", default_value = "logs")]
    log_dir: PathBuf,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress summary and stderr logging (the log file is still written)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn selected_shape(args: &Args) -> Result<RecordShape> {
    match (args.combolist, args.infostealer) {
        (true, false) => Ok(RecordShape::Combolist),
        (false, true) => Ok(RecordShape::Infostealer),
        _ => bail!("you must specify exactly one of --combolist or --infostealer"),
    }
}

fn build_config(args: &Args) -> Result<IngestConfig> {
    let shape = selected_shape(args)?;
    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let mut config = IngestConfig::new(shape, &args.file_path)
        .with_backup_dir(&args.backup_dir)
        .with_report_dir(&args.report_dir)
        .with_mmap_threshold(threshold);
    if let Some(db) = &args.db {
        config = config.with_store_path(db);
    }
    config.validate()?;
    Ok(config)
}

/// Log a fatal error and exit. Quiet runs still tell the operator on stderr.
fn fail(quiet: bool, code: i32, msg: String) -> ! {
    error!("{}", msg);
    if quiet {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }
    std::process::exit(code);
}

fn main() {
    let args = Args::parse();
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let log_config = LogConfig {
        dir: args.log_dir.clone(),
        verbosity: args.verbose,
        quiet: args.quiet,
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(2);
    }

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => fail(args.quiet, 2, format!("{:#}", e)),
    };

    match run(&config) {
        Ok(summary) => {
            if !args.quiet {
                println!("{}", render_summary(&summary));
            }
        }
        Err(e) if e.is_configuration() => fail(args.quiet, 2, e.to_string()),
        Err(e) => fail(args.quiet, 3, format!("run aborted: {}", e)),
    }
}
