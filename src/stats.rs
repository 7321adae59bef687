//! Per-run counters.
//!
//! `RunStats` tallies every line the pipeline reads by the state it ended in.
use crate::engine::LineOutcome;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub lines_read: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
}

pub fn pct(n: u64, d: u64) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

impl RunStats {
    pub fn record(&mut self, outcome: &LineOutcome) {
        self.lines_read += 1;
        match outcome {
            LineOutcome::Rejected(_) => self.rejected += 1,
            LineOutcome::Duplicate => self.duplicates += 1,
            LineOutcome::Committed { .. } => self.accepted += 1,
        }
    }

    pub fn accepted_percentage(&self) -> String {
        pct(self.accepted, self.lines_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_line;
    use crate::shape::RecordShape;

    #[test]
    fn counts_each_outcome() {
        let mut s = RunStats::default();
        s.record(&LineOutcome::Committed { id: 1 });
        s.record(&LineOutcome::Duplicate);
        let rejection = parse_line("nope", RecordShape::Combolist).unwrap_err();
        s.record(&LineOutcome::Rejected(rejection));
        s.record(&LineOutcome::Committed { id: 2 });
        assert_eq!(
            s,
            RunStats {
                lines_read: 4,
                accepted: 2,
                duplicates: 1,
                rejected: 1,
            }
        );
        assert_eq!(s.accepted_percentage(), "50.00%");
    }

    #[test]
    fn percentage_of_empty_run() {
        assert_eq!(RunStats::default().accepted_percentage(), "0.00%");
    }
}
