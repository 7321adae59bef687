//! Human-readable end-of-run summary for terminal output.
//!
//! Produces a colored summary of line counts, the store that was written, the
//! report file and what happened to the pre-run backup.
use colored::*;

use crate::{backup::BackupOutcome, engine::RunSummary};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format!("LeakDB: {} ingestion results", summary.shape)
            .bold()
            .cyan()
    ));

    let s = &summary.stats;
    out.push_str(&section_header(
        &"Line Statistics".bold().yellow().to_string(),
    ));
    for line in [
        format!("Lines read: {}", s.lines_read),
        format!(
            "Accepted: {} ({})",
            s.accepted.to_string().green(),
            s.accepted_percentage()
        ),
        format!("Duplicates: {}", s.duplicates),
        format!("Rejected: {}", s.rejected),
    ] {
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&section_header(&"Outputs".bold().cyan().to_string()));
    out.push_str(&format!(
        "Store: {} ({} entries)\n",
        summary.store_path.display(),
        summary.store_entries
    ));
    out.push_str(&format!("Report: {}\n", summary.report_path.display()));
    let backup_line = match &summary.backup {
        BackupOutcome::Created(path) => path.display().to_string(),
        BackupOutcome::Skipped => "(No existing store, nothing to back up)"
            .dimmed()
            .to_string(),
        BackupOutcome::Failed(reason) => format!("FAILED: {}", reason).red().bold().to_string(),
    };
    out.push_str(&format!("Backup: {}\n", backup_line));

    out
}
