//! Engine: the ingestion pipeline. Every input line is parsed, fingerprinted,
//! checked against the dedup index and, when new, committed to the store and
//! appended to the run's report, strictly in input order.
//!
//! Per line the pipeline moves through `Read -> Parsed | Rejected`,
//! `Parsed -> Duplicate | New`, `New -> Committed | InsertFailed` and
//! `Committed -> Reported`. Rejected and duplicate lines are counted and the
//! run continues. An insert that cannot be committed ends the run with
//! [`IngestError::StoreWriteFailure`]; nothing is added to the index or the
//! report for that line, and everything committed before it stays put.
//!
//! Typical usage:
//!
//! ```no_run
//! use leakdb::{config::IngestConfig, engine::run, shape::RecordShape};
//! # fn main() -> anyhow::Result<()> {
//! let config = IngestConfig::new(RecordShape::Combolist, "/path/to/combo.txt");
//! let summary = run(&config)?;
//! println!("{}", leakdb::report::render_summary(&summary));
//! # Ok(())
//! # }
//! ```
use std::fs;
use std::io;
use std::iter::Peekable;
use std::path::PathBuf;

use chrono::Local;
use log::{debug, info, warn};

use crate::backup::{self, BackupOutcome};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::export::ReportWriter;
use crate::fingerprint::Fingerprint;
use crate::index::DedupIndex;
use crate::io::{LineIter, iter_lines_auto};
use crate::record::{ParseRejection, decode_line, parse_line};
use crate::shape::RecordShape;
use crate::stats::RunStats;
use crate::store::{Store, StoreError};

/// Final state of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Rejected(ParseRejection),
    Duplicate,
    Committed { id: i64 },
}

pub struct Engine {
    shape: RecordShape,
    store: Store,
    index: DedupIndex,
    report: ReportWriter,
    stats: RunStats,
}

impl Engine {
    /// Bootstrap the dedup index from the store.
    pub fn new(store: Store, report: ReportWriter) -> Result<Self, StoreError> {
        let index = DedupIndex::load(&store)?;
        Ok(Self {
            shape: store.shape(),
            store,
            index,
            report,
            stats: RunStats::default(),
        })
    }

    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn ingest_line(&mut self, line: &str) -> Result<LineOutcome, IngestError> {
        self.ingest_raw(line.as_bytes())
    }

    /// Ingest one input line exactly as read, minus its terminator.
    pub fn ingest_raw(&mut self, raw: &[u8]) -> Result<LineOutcome, IngestError> {
        let outcome = self.process(raw)?;
        self.stats.record(&outcome);
        Ok(outcome)
    }

    fn process(&mut self, raw: &[u8]) -> Result<LineOutcome, IngestError> {
        let parsed = decode_line(raw)
            .and_then(|line| parse_line(line, self.shape).map(|record| (line, record)));
        let (line, record) = match parsed {
            Ok(p) => p,
            Err(rejection) => {
                warn!(
                    "invalid input for {}: {} ({})",
                    self.shape.flag(),
                    rejection.line(),
                    rejection.reason()
                );
                return Ok(LineOutcome::Rejected(rejection));
            }
        };

        let fp = Fingerprint::of(&record);
        if self.index.contains(&fp) {
            return Ok(LineOutcome::Duplicate);
        }

        let id = self
            .store
            .insert(&record, &fp, Local::now())
            .map_err(|source| IngestError::StoreWriteFailure {
                line: line.to_string(),
                source,
            })?;
        // committed: the index may learn it now
        self.index.add(fp);
        debug!("inserted new entry #{}: {}", id, line);

        self.report
            .append(line)
            .map_err(|source| IngestError::ReportWriteFailure {
                line: line.to_string(),
                source,
            })?;
        Ok(LineOutcome::Committed { id })
    }

    /// Feed lines in order until the iterator ends or a run-fatal error.
    pub fn ingest_lines<I>(&mut self, lines: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = io::Result<Vec<u8>>>,
    {
        for line in lines {
            let line = line.map_err(|source| IngestError::Io {
                context: "read input line".to_string(),
                source,
            })?;
            self.ingest_raw(&line)?;
        }
        Ok(())
    }

    /// Close the report and hand back the counters and report path.
    pub fn finish(self) -> Result<(RunStats, PathBuf), IngestError> {
        let report_path = self.report.finish().map_err(|source| IngestError::Io {
            context: "close report".to_string(),
            source,
        })?;
        Ok((self.stats, report_path))
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub shape: RecordShape,
    pub store_path: PathBuf,
    pub report_path: PathBuf,
    pub backup: BackupOutcome,
    pub stats: RunStats,
    pub store_entries: u64,
}

/// Open the input and read its first line. Failing either means the run
/// never starts, so nothing has been backed up, created or written yet.
fn open_input(config: &IngestConfig) -> Result<Peekable<LineIter>, IngestError> {
    let unreadable = |reason: String| {
        IngestError::Configuration(format!(
            "input file unreadable: {}: {}",
            config.input.display(),
            reason
        ))
    };
    let mut lines = iter_lines_auto(&config.input, config.mmap_threshold)
        .map_err(|e| unreadable(format!("{:#}", e)))?
        .peekable();
    if let Some(Err(e)) = lines.peek() {
        return Err(unreadable(e.to_string()));
    }
    Ok(lines)
}

/// One full run: validate, open the input, back up, open the store, ingest,
/// close.
pub fn run(config: &IngestConfig) -> Result<RunSummary, IngestError> {
    config.validate()?;
    let lines = open_input(config)?;
    info!("=============run started=============");
    info!(
        "ingesting {} as {} into {}",
        config.input.display(),
        config.shape,
        config.store_path.display()
    );

    let backup = backup::backup(&config.store_path, &config.backup_dir);

    if let Some(parent) = config.store_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| IngestError::Io {
                context: format!("create {}", parent.display()),
                source,
            })?;
        }
    }
    let store_err = |source| IngestError::Store {
        path: config.store_path.clone(),
        source,
    };
    let store = Store::open(&config.store_path, config.shape).map_err(store_err)?;
    let report =
        ReportWriter::create(&config.report_dir, Local::now()).map_err(|source| IngestError::Io {
            context: format!("create report in {}", config.report_dir.display()),
            source,
        })?;
    info!("new leaks are reported to {}", report.path().display());
    let mut engine = Engine::new(store, report).map_err(store_err)?;
    if engine.index().is_empty() {
        info!("store is empty; every valid line is new");
    } else {
        info!("{} fingerprints already stored", engine.index().len());
    }
    engine.ingest_lines(lines)?;

    let stats = engine.stats();
    info!(
        "run finished: read={} accepted={} duplicate={} rejected={}",
        stats.lines_read, stats.accepted, stats.duplicates, stats.rejected
    );
    let store_entries = engine.store().count().map_err(store_err)?;
    let (stats, report_path) = engine.finish()?;
    info!("=============run finished=============");

    Ok(RunSummary {
        shape: config.shape,
        store_path: config.store_path.clone(),
        report_path,
        backup,
        stats,
        store_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::path::Path;
    use tempfile::tempdir;

    fn lines(v: &[&str]) -> Vec<io::Result<Vec<u8>>> {
        v.iter().map(|s| Ok(s.as_bytes().to_vec())).collect()
    }

    fn engine_at(dir: &Path, shape: RecordShape) -> Engine {
        let store = Store::open(dir.join(shape.default_store_file()), shape).unwrap();
        let report = ReportWriter::create(&dir.join("reports"), Local::now()).unwrap();
        Engine::new(store, report).unwrap()
    }

    #[test]
    fn combolist_duplicates_are_dropped() {
        let dir = tempdir().unwrap();
        let mut e = engine_at(dir.path(), RecordShape::Combolist);
        e.ingest_lines(lines(&["alice:pw1", "bob:pw2", "alice:pw1"]))
            .unwrap();
        assert_eq!(e.store().count().unwrap(), 2);
        let (stats, report) = e.finish().unwrap();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(
            fs::read_to_string(report).unwrap(),
            "alice:pw1\nbob:pw2\n"
        );
    }

    #[test]
    fn infostealer_entry_is_stored_with_digest() {
        let dir = tempdir().unwrap();
        let mut e = engine_at(dir.path(), RecordShape::Infostealer);
        let outcome = e.ingest_line("http://x.com,eve,pw3").unwrap();
        assert!(matches!(outcome, LineOutcome::Committed { .. }));
        drop(e);

        let conn = Connection::open(dir.path().join("infostealer-leaks.sqlite")).unwrap();
        let row: (String, String, String, String) = conn
            .query_row(
                "SELECT url, user, pass, hash FROM infostealer_leaks",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(
            row,
            (
                "http://x.com".to_string(),
                "eve".to_string(),
                "pw3".to_string(),
                "e5fa68cd72b0b0819a05ca7f2473aae9e3e244b47495cd0296bdf6f1c885aa32".to_string()
            )
        );
    }

    #[test]
    fn rejected_line_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let mut e = engine_at(dir.path(), RecordShape::Combolist);
        e.ingest_lines(lines(&["onlyonefield", "carol:pw4"])).unwrap();
        assert_eq!(e.stats().rejected, 1);
        assert_eq!(e.stats().accepted, 1);
        assert_eq!(e.index().len(), 1);
        assert_eq!(e.store().count().unwrap(), 1);
        let (_, report) = e.finish().unwrap();
        assert_eq!(fs::read_to_string(report).unwrap(), "carol:pw4\n");
    }

    #[test]
    fn second_pass_over_same_input_inserts_nothing() {
        let dir = tempdir().unwrap();
        let input = ["alice:pw1", "bob:pw2"];
        {
            let mut e = engine_at(dir.path(), RecordShape::Combolist);
            e.ingest_lines(lines(&input)).unwrap();
            e.finish().unwrap();
        }
        let mut e = engine_at(dir.path(), RecordShape::Combolist);
        assert_eq!(e.index().len(), 2);
        e.ingest_lines(lines(&input)).unwrap();
        assert_eq!(e.store().count().unwrap(), 2);
        let (stats, report) = e.finish().unwrap();
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(fs::read_to_string(report).unwrap(), "");
    }

    #[test]
    fn insert_failure_aborts_and_keeps_report_truthful() {
        let dir = tempdir().unwrap();
        let db = dir.path().join(RecordShape::Combolist.default_store_file());
        {
            let store = Store::open(&db, RecordShape::Combolist).unwrap();
            drop(store);
            let conn = Connection::open(&db).unwrap();
            conn.execute_batch(
                "CREATE TRIGGER refuse_mallory BEFORE INSERT ON combolist_leaks
                 WHEN NEW.user = 'mallory'
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
            )
            .unwrap();
        }
        let mut e = engine_at(dir.path(), RecordShape::Combolist);
        let err = e
            .ingest_lines(lines(&["alice:pw1", "mallory:pw", "bob:pw2"]))
            .unwrap_err();
        match err {
            IngestError::StoreWriteFailure { ref line, .. } => assert_eq!(line, "mallory:pw"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(e.store().count().unwrap(), 1);
        assert_eq!(e.index().len(), 1);
        assert_eq!(e.stats().accepted, 1);
        let (_, report) = e.finish().unwrap();
        assert_eq!(fs::read_to_string(report).unwrap(), "alice:pw1\n");
    }

    #[test]
    fn lines_differing_only_in_invalid_bytes_are_rejected() {
        let dir = tempdir().unwrap();
        let mut e = engine_at(dir.path(), RecordShape::Combolist);
        let input: Vec<io::Result<Vec<u8>>> = vec![
            Ok(b"user\xff:pw".to_vec()),
            Ok(b"user\xfe:pw".to_vec()),
            Ok(b"alice:pw1".to_vec()),
        ];
        e.ingest_lines(input).unwrap();
        assert_eq!(e.stats().rejected, 2);
        assert_eq!(e.stats().duplicates, 0);
        assert_eq!(e.stats().accepted, 1);
        assert_eq!(e.store().count().unwrap(), 1);
        let (_, report) = e.finish().unwrap();
        assert_eq!(fs::read_to_string(report).unwrap(), "alice:pw1\n");
    }

    #[test]
    fn report_failure_after_commit_keeps_row_and_fingerprint() {
        let dir = tempdir().unwrap();
        let store = Store::open(
            dir.path().join(RecordShape::Combolist.default_store_file()),
            RecordShape::Combolist,
        )
        .unwrap();
        let report_path = dir.path().join("report.txt");
        fs::write(&report_path, "").unwrap();
        // read-only handle: every write fails, even for root
        let read_only = fs::File::open(&report_path).unwrap();
        let mut e = Engine::new(store, ReportWriter::from_file(report_path, read_only)).unwrap();

        let err = e.ingest_line("alice:pw1").unwrap_err();
        match err {
            IngestError::ReportWriteFailure { ref line, .. } => assert_eq!(line, "alice:pw1"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_configuration());
        assert_eq!(e.store().count().unwrap(), 1);
        let record = crate::record::parse_line("alice:pw1", RecordShape::Combolist).unwrap();
        assert!(e.index().contains(&Fingerprint::of(&record)));
    }

    #[test]
    fn run_backs_up_existing_store_before_ingesting() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("combo.txt");
        fs::write(&input, "alice:pw1\nbob:pw2\nalice:pw1\nonlyonefield\n").unwrap();
        let config = IngestConfig::new(RecordShape::Combolist, &input)
            .with_store_path(dir.path().join("db").join("combolists-leaks.sqlite"))
            .with_backup_dir(dir.path().join("backups"))
            .with_report_dir(dir.path().join("reports"));

        let first = run(&config).unwrap();
        assert_eq!(first.backup, BackupOutcome::Skipped);
        assert_eq!(first.stats.lines_read, 4);
        assert_eq!(first.stats.accepted, 2);
        assert_eq!(first.stats.duplicates, 1);
        assert_eq!(first.stats.rejected, 1);
        assert_eq!(first.store_entries, 2);

        let second = run(&config).unwrap();
        match &second.backup {
            BackupOutcome::Created(path) => assert!(path.exists()),
            other => panic!("expected a backup, got {:?}", other),
        }
        assert_eq!(second.stats.accepted, 0);
        assert_eq!(second.store_entries, 2);
        assert_ne!(first.report_path, second.report_path);
        assert_eq!(fs::read_to_string(&second.report_path).unwrap(), "");
    }

    #[test]
    fn run_refuses_missing_input() {
        let dir = tempdir().unwrap();
        let config = IngestConfig::new(RecordShape::Combolist, dir.path().join("absent.txt"))
            .with_store_path(dir.path().join("combolists-leaks.sqlite"));
        assert!(run(&config).unwrap_err().is_configuration());
        assert!(!dir.path().join("combolists-leaks.sqlite").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreadable_input_touches_nothing() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("combolists-leaks.sqlite");
        {
            let mut store = Store::open(&db, RecordShape::Combolist).unwrap();
            let r = crate::record::parse_line("alice:pw1", RecordShape::Combolist).unwrap();
            store.insert(&r, &Fingerprint::of(&r), Local::now()).unwrap();
        }
        // a regular file as far as metadata goes, but reading offset 0 fails
        let config = IngestConfig::new(RecordShape::Combolist, "/proc/self/mem")
            .with_store_path(&db)
            .with_backup_dir(dir.path().join("backups"))
            .with_report_dir(dir.path().join("reports"))
            .with_mmap_threshold(u64::MAX);

        let err = run(&config).unwrap_err();
        assert!(err.is_configuration(), "unexpected error: {err}");
        assert!(!dir.path().join("backups").exists());
        assert!(!dir.path().join("reports").exists());
    }
}
