//! JSONL logger: append-only line-delimited JSON for machine-readable run logs.
//!
//! Each line is a self-contained JSON object assembled in memory and written
//! with a single `write_all`, so a tailing reader never sees a partial line.
//!
//! Three-level fallback chain:
//! 1. Configured file path
//! 2. stderr with `[SVS-JSONL]` prefix
//! 3. Silent discard (a sweep must never fail because logging failed)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SvsError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Log event types matching the sweep activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SweepStart,
    FileProcessing,
    FileCleared,
    FileFailed,
    BackupCreated,
    OriginalRemoved,
    ReplacementWritten,
    CleanCopyPlaced,
    TempDiscarded,
    SweepComplete,
}

/// A single JSONL log entry. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Second path of a two-path operation (backup target, copy destination).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_kept: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            target: None,
            blocks_removed: None,
            blocks_kept: None,
            cleaned: None,
            failed: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL log writer with stderr fallback.
pub struct JsonlWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the JSONL log file. Falls through the degradation chain on failure.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match open_append(&path) {
            Ok((file, size)) => Self {
                path,
                writer: Some(BufWriter::with_capacity(16 * 1024, file)),
                state: WriterState::Normal,
                bytes_written: size,
            },
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SVS-JSONL] {e}; using stderr");
                Self {
                    path,
                    writer: None,
                    state: WriterState::Stderr,
                    bytes_written: 0,
                }
            }
        }
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SVS-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    /// Size of the log file including bytes written by this writer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut()
                    && w.write_all(line.as_bytes()).is_ok()
                {
                    self.bytes_written += line.len() as u64;
                    return;
                }
                self.degrade();
                self.write_line(line);
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[SVS-JSONL] {line}").is_err() {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => {
                let _ = writeln!(
                    io::stderr(),
                    "[SVS-JSONL] write to {} failed, using stderr",
                    self.path.display()
                );
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SvsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SvsError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(&path);

        let mut entry = LogEntry::new(EventType::FileCleared, Severity::Info);
        entry.path = Some("/scenes/a.ma".to_string());
        entry.blocks_removed = Some(2);
        writer.write_entry(&entry);
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "file_cleared");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["blocks_removed"], 2);
        assert!(parsed.get("error_code").is_none());
        assert_eq!(writer.state(), "normal");
    }

    #[test]
    fn appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("multi.jsonl");
        {
            let mut writer = JsonlWriter::open(&path);
            writer.write_entry(&LogEntry::new(EventType::SweepStart, Severity::Info));
        }
        let mut writer = JsonlWriter::open(&path);
        assert!(writer.bytes_written() > 0);
        for _ in 0..3 {
            writer.write_entry(&LogEntry::new(EventType::FileProcessing, Severity::Debug));
        }
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn unopenable_path_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let writer = JsonlWriter::open(blocker.join("log.jsonl"));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn severity_orders_by_importance() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
