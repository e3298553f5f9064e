use serde::Serialize;
use std::time::{Duration, Instant};

/// What happened to one file during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Persisted { document_id: i64 },
    PartiallyPersisted { document_id: i64 },
    StructuringFailed,
    MalformedResponse,
    /// `document_id` is set when a partial Document was left behind.
    DatabaseFailed { document_id: Option<i64> },
    /// Unknown format; archived without extraction.
    Unsupported,
    /// Extraction produced no text; left in the watch directory.
    EmptyText,
}

/// Summary of one directory scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub files_seen: usize,
    pub persisted: usize,
    pub partially_persisted: usize,
    pub structuring_failed: usize,
    pub malformed_responses: usize,
    pub database_failed: usize,
    pub unsupported: usize,
    pub empty_text: usize,
    pub archived: usize,
    pub archive_failed: usize,
    pub aborted: bool,
    pub elapsed_ms: u128,
}

impl ScanReport {
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Persisted { .. } => self.persisted += 1,
            FileOutcome::PartiallyPersisted { .. } => self.partially_persisted += 1,
            FileOutcome::StructuringFailed => self.structuring_failed += 1,
            FileOutcome::MalformedResponse => self.malformed_responses += 1,
            FileOutcome::DatabaseFailed { .. } => self.database_failed += 1,
            FileOutcome::Unsupported => self.unsupported += 1,
            FileOutcome::EmptyText => self.empty_text += 1,
        }
    }

    pub fn record_archive(&mut self, success: bool) {
        if success {
            self.archived += 1;
        } else {
            self.archive_failed += 1;
        }
    }

    pub fn finish(&mut self, duration: Duration) {
        self.elapsed_ms = duration.as_millis();
    }
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
