use crate::archive;
use crate::config::{AppConfig, ScanPolicy};
use crate::metrics::{FileOutcome, ScanReport, TimedOperation};
use crate::watcher::DirectoryWatcher;
use anyhow::{Context, Result};
use extract::Structurer;
use index::{DocumentStore, PersistError};
use ingest::{DocumentFormat, Extractor};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Routes every file in the watch directory through
/// extraction, structuring, persistence and archival, one at a time.
pub struct Dispatcher<'a> {
    config: &'a AppConfig,
    extractor: Extractor,
    structurer: Box<dyn Structurer>,
    store: DocumentStore,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &'a AppConfig,
        extractor: Extractor,
        structurer: Box<dyn Structurer>,
        store: DocumentStore,
    ) -> Self {
        Self {
            config,
            extractor,
            structurer,
            store,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn into_store(self) -> DocumentStore {
        self.store
    }

    /// Regular files currently in the watch directory, sorted by name.
    pub fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.paths.watch_dir;
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context(format!("Failed to list directory: {:?}", dir))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Attempt every file currently in the watch directory.
    pub async fn scan(&self) -> ScanReport {
        let timer = TimedOperation::start();
        let mut report = ScanReport::default();
        let watch_dir = &self.config.paths.watch_dir;

        let files = match self.pending_files() {
            Ok(files) => files,
            Err(e) => {
                error!(dir = %watch_dir.display(), error = %e, "Failed to scan watch directory");
                report.finish(timer.elapsed());
                return report;
            }
        };

        if files.is_empty() {
            info!(dir = %watch_dir.display(), "The watch directory is empty");
            report.finish(timer.elapsed());
            return report;
        }

        report.files_seen = files.len();

        for file in &files {
            let destination = match archive::destination_for(&self.config.paths.archive_dir, file) {
                Ok(destination) => destination,
                Err(e) => {
                    error!(file = %file.display(), error = %e, "Cannot archive file, skipping");
                    continue;
                }
            };

            let outcome = self.process_file(file, &destination).await;
            report.record(&outcome);

            if outcome == FileOutcome::EmptyText {
                match self.config.scan_policy {
                    ScanPolicy::AbortScan => {
                        warn!(file = %file.display(), "No text extracted, aborting scan");
                        report.aborted = true;
                        break;
                    }
                    ScanPolicy::SkipFile => {
                        warn!(file = %file.display(), "No text extracted, skipping file");
                        continue;
                    }
                }
            }

            let archived = match archive::move_file(file, &destination).await {
                Ok(()) => {
                    info!(file = %file.display(), to = %destination.display(), "Moved file");
                    true
                }
                Err(e) => {
                    error!(file = %file.display(), error = %format!("{:#}", e), "Failed to archive file");
                    false
                }
            };
            report.record_archive(archived);
        }

        report.finish(timer.elapsed());
        report
    }

    /// Extract, structure and persist one file. Never fails: every error is
    /// logged and reported as an outcome.
    pub async fn process_file(&self, file: &Path, destination: &Path) -> FileOutcome {
        let format = DocumentFormat::from_path(file);
        if format == DocumentFormat::Unknown {
            info!(file = %file.display(), "Unsupported format, archiving without processing");
            return FileOutcome::Unsupported;
        }

        let timer = TimedOperation::start();
        let text = self.extractor.extract(file, format).await;
        if text.trim().is_empty() {
            return FileOutcome::EmptyText;
        }
        info!(
            file = %file.display(),
            format = ?format,
            chars = text.chars().count(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "Text extracted"
        );

        let json = match extract::structure_text(self.structurer.as_ref(), &text).await {
            Ok(json) => json,
            Err(e) => {
                error!(file = %file.display(), error = %format!("{:#}", e), "Structuring failed");
                return FileOutcome::StructuringFailed;
            }
        };
        debug!(file = %file.display(), response = %json, "Structuring response");

        let link_original = destination.to_string_lossy();
        match index::persist_response(&self.store, &json, &link_original) {
            Ok(document_id) => {
                info!(file = %file.display(), document_id, "Document stored");
                FileOutcome::Persisted { document_id }
            }
            Err(PersistError::UnsupportedShape { document_id, source }) => {
                warn!(
                    file = %file.display(),
                    document_id,
                    error = %source,
                    "Document stored partially"
                );
                FileOutcome::PartiallyPersisted { document_id }
            }
            Err(PersistError::Malformed(e)) => {
                error!(file = %file.display(), error = %e, response = %json, "Malformed structuring response");
                FileOutcome::MalformedResponse
            }
            Err(PersistError::Database { document_id, source }) => {
                error!(
                    file = %file.display(),
                    document_id = ?document_id,
                    error = %source,
                    "Failed to store document"
                );
                FileOutcome::DatabaseFailed { document_id }
            }
        }
    }
}

/// Scan on every batch of qualifying events until `shutdown` resolves.
///
/// The shutdown signal is only observed between scans; a scan in progress
/// always runs to completion. `shutdown` must already be listening when
/// this is called (see [`crate::shutdown::interrupt`]), otherwise an
/// interrupt during the startup scan is lost.
pub async fn run<F>(dispatcher: &Dispatcher<'_>, watcher: &mut DirectoryWatcher, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if dispatcher.config.startup_scan {
        log_report(&dispatcher.scan().await);
    }

    info!(dir = %dispatcher.config.paths.watch_dir.display(), "Watching for documents");

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Interrupt received, stopping");
                break;
            }
            batch = watcher.next_batch() => match batch {
                Some(events) => {
                    debug!(events, "Directory changed");
                    log_report(&dispatcher.scan().await);
                }
                None => {
                    warn!("Watcher stopped delivering events");
                    break;
                }
            }
        }
    }
}

fn log_report(report: &ScanReport) {
    if report.files_seen == 0 {
        return;
    }
    info!(
        files = report.files_seen,
        persisted = report.persisted,
        partial = report.partially_persisted,
        structuring_failed = report.structuring_failed,
        malformed = report.malformed_responses,
        database_failed = report.database_failed,
        unsupported = report.unsupported,
        empty_text = report.empty_text,
        archived = report.archived,
        archive_failed = report.archive_failed,
        aborted = report.aborted,
        elapsed_ms = report.elapsed_ms as u64,
        "Scan finished"
    );
}
