use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ObsError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the file's ingestion failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Context about one file's ingestion attempt.
#[derive(Debug, Clone)]
pub struct IngestContext {
    /// The raw file being ingested.
    pub path: PathBuf,
    /// Camera-variant name from the active configuration.
    pub camera: String,
}

/// Minimal stats reported on a successfully ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// The derived visit number, when the variant registers one.
    pub visit: Option<i64>,
    /// Number of resolved record fields.
    pub fields: usize,
}

/// Observer interface for per-file ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestObserver: Send + Sync {
    /// Called when a file's record is produced.
    fn on_success(&self, _ctx: &IngestContext, _stats: IngestStats) {}

    /// Called when a file's ingestion fails.
    fn on_failure(&self, _ctx: &IngestContext, _severity: IngestSeverity, _error: &ObsError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestContext, stats: IngestStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs ingestion events through the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl IngestObserver for LogObserver {
    fn on_success(&self, ctx: &IngestContext, stats: IngestStats) {
        log::info!(
            "ingested camera={} path={} visit={:?} fields={}",
            ctx.camera,
            ctx.path.display(),
            stats.visit,
            stats.fields
        );
    }

    fn on_failure(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        log::warn!(
            "ingest failed ({severity:?}) camera={} path={} err={error}",
            ctx.camera,
            ctx.path.display()
        );
    }

    fn on_alert(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        log::error!(
            "ALERT ingest ({severity:?}) camera={} path={} err={error}",
            ctx.camera,
            ctx.path.display()
        );
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestObserver for FileObserver {
    fn on_success(&self, ctx: &IngestContext, stats: IngestStats) {
        self.append_line(&format!(
            "{} ok camera={} path={} visit={:?} fields={}",
            unix_ts(),
            ctx.camera,
            ctx.path.display(),
            stats.visit,
            stats.fields
        ));
    }

    fn on_failure(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        self.append_line(&format!(
            "{} fail severity={:?} camera={} path={} err={}",
            unix_ts(),
            severity,
            ctx.camera,
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestContext, severity: IngestSeverity, error: &ObsError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} camera={} path={} err={}",
            unix_ts(),
            severity,
            ctx.camera,
            ctx.path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
