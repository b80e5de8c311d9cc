//! Import pass results
//!
//! Aggregate counters returned from the orchestrator. These are a value,
//! not module state, so repeated or interleaved passes in one process
//! cannot contaminate each other.

use serde::{Deserialize, Serialize};

/// One retained per-record failure reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordError {
    /// 0-based data-row index within the source, when known
    pub row_index: Option<usize>,
    /// Primary key of the record, when one was resolved
    pub key: Option<i64>,
    /// Human-readable reason
    pub message: String,
}

/// Aggregate result of one import pass over one sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records seen in the source
    pub total: usize,
    /// Records whose full relation set committed
    pub committed: usize,
    /// Records with no resolvable primary key
    pub skipped: usize,
    /// Records whose relation writes failed and were rolled back
    pub errored: usize,
    /// Retained reasons for the errored records
    pub errors: Vec<RecordError>,
    /// Songs row id created or updated by a score-calc pass
    pub song_row_id: Option<i64>,
    /// Team composition row id written by a score-calc pass
    pub team_row_id: Option<i64>,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_committed(&mut self) {
        self.total += 1;
        self.committed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn record_errored(&mut self, row_index: Option<usize>, key: Option<i64>, message: String) {
        self.total += 1;
        self.errored += 1;
        self.errors.push(RecordError {
            row_index,
            key,
            message,
        });
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} total, {} committed, {} skipped, {} errored",
            self.total, self.committed, self.skipped, self.errored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_outcomes() {
        let mut summary = ImportSummary::new();
        summary.record_committed();
        summary.record_committed();
        summary.record_skipped();
        summary.record_errored(Some(3), Some(101), "constraint violated".to_string());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.committed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].key, Some(101));
        assert_eq!(summary.to_string(), "4 total, 2 committed, 1 skipped, 1 errored");
    }
}
