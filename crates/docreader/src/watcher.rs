use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

/// "File finished being written" and "file moved into the directory".
pub fn is_qualifying(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    )
}

/// Non-recursive watch on a single directory.
pub struct DirectoryWatcher {
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
    events: UnboundedReceiver<notify::Result<Event>>,
}

impl DirectoryWatcher {
    pub fn start(dir: &Path) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means we are shutting down
            let _ = tx.send(res);
        })
        .context("Failed to create watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .context(format!("Failed to watch directory: {:?}", dir))?;

        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Wait for the next qualifying event, then drain everything already
    /// queued behind it. Returns the number of qualifying events in the
    /// batch, or `None` once the event stream has ended.
    pub async fn next_batch(&mut self) -> Option<usize> {
        loop {
            match self.events.recv().await? {
                Ok(event) if is_qualifying(&event.kind) => break,
                Ok(event) => debug!(kind = ?event.kind, "Ignoring event"),
                Err(e) => warn!(error = %e, "Watcher error"),
            }
        }

        let mut count = 1;
        while let Ok(res) = self.events.try_recv() {
            if matches!(&res, Ok(event) if is_qualifying(&event.kind)) {
                count += 1;
            }
        }
        Some(count)
    }
}
