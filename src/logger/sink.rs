//! Activity sinks: the logging seam injected into every sweep component.
//!
//! Components never touch a global logger. They receive a `&dyn ActivitySink`
//! and report [`ActivityEvent`]s; the composition root decides where those go
//! (stderr, a JSONL file, memory for tests, or several at once).

#![allow(missing_docs)]

use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};

/// Events emitted during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    SweepStarted {
        root: PathBuf,
        config_hash: Option<String>,
    },
    FileProcessing {
        path: PathBuf,
    },
    FileCleared {
        path: PathBuf,
        blocks_removed: usize,
        blocks_kept: usize,
    },
    FileFailed {
        path: PathBuf,
        error_code: String,
        error_message: String,
    },
    BackupCreated {
        original: PathBuf,
        backup: PathBuf,
    },
    OriginalRemoved {
        path: PathBuf,
    },
    ReplacementWritten {
        path: PathBuf,
        source: PathBuf,
    },
    CleanCopyPlaced {
        original: PathBuf,
        clean: PathBuf,
    },
    TempDiscarded {
        path: PathBuf,
    },
    SweepCompleted {
        root: PathBuf,
        cleaned: usize,
        failed: usize,
        duration_ms: u64,
    },
}

impl ActivityEvent {
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::SweepStarted { .. } => EventType::SweepStart,
            Self::FileProcessing { .. } => EventType::FileProcessing,
            Self::FileCleared { .. } => EventType::FileCleared,
            Self::FileFailed { .. } => EventType::FileFailed,
            Self::BackupCreated { .. } => EventType::BackupCreated,
            Self::OriginalRemoved { .. } => EventType::OriginalRemoved,
            Self::ReplacementWritten { .. } => EventType::ReplacementWritten,
            Self::CleanCopyPlaced { .. } => EventType::CleanCopyPlaced,
            Self::TempDiscarded { .. } => EventType::TempDiscarded,
            Self::SweepCompleted { .. } => EventType::SweepComplete,
        }
    }

    pub const fn severity(&self) -> Severity {
        match self {
            Self::FileProcessing { .. } | Self::TempDiscarded { .. } => Severity::Debug,
            Self::FileFailed { .. } => Severity::Error,
            Self::SweepCompleted { failed, .. } if *failed > 0 => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// One-line human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::SweepStarted { root, .. } => format!("Sweeping {}", root.display()),
            Self::FileProcessing { path } => format!("Process file {}", path.display()),
            Self::FileCleared {
                path,
                blocks_removed,
                ..
            } => format!(
                "File cleared: {} ({blocks_removed} block(s) removed)",
                path.display()
            ),
            Self::FileFailed {
                path,
                error_message,
                ..
            } => format!("Failed file {}: {error_message}", path.display()),
            Self::BackupCreated { original, backup } => {
                format!("Backup {} -> {}", original.display(), backup.display())
            }
            Self::OriginalRemoved { path } => format!("Delete {}", path.display()),
            Self::ReplacementWritten { path, source } => {
                format!("Copy {} -> {}", source.display(), path.display())
            }
            Self::CleanCopyPlaced { clean, .. } => format!("Wrote {}", clean.display()),
            Self::TempDiscarded { path } => format!("Discarded unused {}", path.display()),
            Self::SweepCompleted {
                cleaned, failed, ..
            } => {
                if *failed > 0 {
                    format!("Total cleaned files: {cleaned}; failed to clean {failed} files")
                } else {
                    format!("Total cleaned files: {cleaned}")
                }
            }
        }
    }

    /// Structured form for the JSONL log.
    pub fn to_log_entry(&self) -> LogEntry {
        let mut entry = LogEntry::new(self.event_type(), self.severity());
        match self {
            Self::SweepStarted { root, config_hash } => {
                entry.path = Some(root.to_string_lossy().into_owned());
                entry.details.clone_from(config_hash);
            }
            Self::FileProcessing { path }
            | Self::OriginalRemoved { path }
            | Self::TempDiscarded { path } => {
                entry.path = Some(path.to_string_lossy().into_owned());
            }
            Self::FileCleared {
                path,
                blocks_removed,
                blocks_kept,
            } => {
                entry.path = Some(path.to_string_lossy().into_owned());
                entry.blocks_removed = Some(*blocks_removed);
                entry.blocks_kept = Some(*blocks_kept);
            }
            Self::FileFailed {
                path,
                error_code,
                error_message,
            } => {
                entry.path = Some(path.to_string_lossy().into_owned());
                entry.error_code = Some(error_code.clone());
                entry.error_message = Some(error_message.clone());
            }
            Self::BackupCreated { original, backup } => {
                entry.path = Some(original.to_string_lossy().into_owned());
                entry.target = Some(backup.to_string_lossy().into_owned());
            }
            Self::ReplacementWritten { path, source } => {
                entry.path = Some(source.to_string_lossy().into_owned());
                entry.target = Some(path.to_string_lossy().into_owned());
            }
            Self::CleanCopyPlaced { original, clean } => {
                entry.path = Some(original.to_string_lossy().into_owned());
                entry.target = Some(clean.to_string_lossy().into_owned());
            }
            Self::SweepCompleted {
                root,
                cleaned,
                failed,
                duration_ms,
            } => {
                entry.path = Some(root.to_string_lossy().into_owned());
                entry.cleaned = Some(*cleaned);
                entry.failed = Some(*failed);
                entry.duration_ms = Some(*duration_ms);
            }
        }
        entry
    }
}

/// Destination for activity events.
pub trait ActivitySink: Send + Sync {
    fn record(&self, event: &ActivityEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ActivitySink for NullSink {
    fn record(&self, _event: &ActivityEvent) {}
}

/// Human-readable diagnostics on stderr, filtered by severity.
#[derive(Debug, Clone, Copy)]
pub struct StderrSink {
    min_severity: Severity,
}

impl StderrSink {
    pub const fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }

    /// Map CLI verbosity flags to a severity floor.
    pub const fn from_verbosity(verbose: bool, quiet: bool) -> Self {
        let min_severity = if quiet {
            Severity::Error
        } else if verbose {
            Severity::Debug
        } else {
            Severity::Info
        };
        Self { min_severity }
    }

    pub const fn min_severity(&self) -> Severity {
        self.min_severity
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl ActivitySink for StderrSink {
    fn record(&self, event: &ActivityEvent) {
        let severity = event.severity();
        if severity < self.min_severity {
            return;
        }
        let label = match severity {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        let _ = writeln!(io::stderr().lock(), "{label}:svs:{}", event.describe());
    }
}

/// Appends every event to a JSONL file.
pub struct JsonlSink {
    writer: Mutex<JsonlWriter>,
}

impl JsonlSink {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(JsonlWriter::open(path)),
        }
    }

    pub fn flush(&self) {
        self.writer.lock().flush();
    }
}

impl ActivitySink for JsonlSink {
    fn record(&self, event: &ActivityEvent) {
        self.writer.lock().write_entry(&event.to_log_entry());
    }
}

/// Keeps events in memory; used by tests and by callers that post-process a run.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<ActivityEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ActivitySink for MemorySink {
    fn record(&self, event: &ActivityEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards each event to every wrapped sink, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ActivitySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl ActivitySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ActivitySink for FanoutSink {
    fn record(&self, event: &ActivityEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
