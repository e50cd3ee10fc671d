//! Snapshot sinks: where structured output documents go.

use crate::TelemetryError;
use crate::model::SnapshotDocument;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Receives a full snapshot after every tracker mutation.
pub trait SnapshotSink: Send + Sync {
    /// Replace the previous snapshot with `doc`.
    fn write(&self, doc: &SnapshotDocument) -> Result<(), TelemetryError>;
}

/// Writes each snapshot to a JSON file, replacing the previous one.
///
/// The document goes to a sibling temp file first and is renamed over the
/// target, so readers never see a half-written snapshot.
///
/// Trackers call sinks synchronously. When that happens on a multi-threaded
/// tokio runtime the write is wrapped in `block_in_place`, so other tasks keep
/// running on the remaining workers. A current-thread runtime cannot hand off
/// its only worker; there the snapshot (a few KB) is written inline.
pub struct JsonFileSnapshotSink {
    path: PathBuf,
}

impl JsonFileSnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn write_file(&self, doc: &SnapshotDocument) -> Result<(), TelemetryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SnapshotSink for JsonFileSnapshotSink {
    fn write(&self, doc: &SnapshotDocument) -> Result<(), TelemetryError> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.write_file(doc))
            }
            _ => self.write_file(doc),
        }
    }
}

/// Keeps the latest snapshot in memory.
#[derive(Default)]
pub struct MemorySnapshotSink {
    latest: Mutex<Option<SnapshotDocument>>,
    writes: Mutex<usize>,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<SnapshotDocument> {
        self.latest.lock().ok().and_then(|l| l.clone())
    }

    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl SnapshotSink for MemorySnapshotSink {
    fn write(&self, doc: &SnapshotDocument) -> Result<(), TelemetryError> {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(doc.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
