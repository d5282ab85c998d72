//! Batch runner: sanitizes every file a walk produced and isolates failures.
//!
//! Per file: sanitize -> (replace in place | move to `<original>.clean`).
//! Any error in that chain turns into a [`FileOutcome::Failed`] for that file
//! only; the batch always runs to the end.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cleaner::replace::{self, ReplaceOptions};
use crate::cleaner::sanitizer::{Sanitizer, SanitizerOptions};
use crate::core::config::Config;
use crate::core::errors::{Result, SvsError};
use crate::logger::sink::{ActivityEvent, ActivitySink};
use crate::scanner::walker::DirectoryWalker;

// ──────────────────── report types ────────────────────

/// A single per-file failure record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error_code: String,
    pub error: String,
    pub retryable: bool,
}

impl FileFailure {
    fn from_error(path: &Path, err: &SvsError) -> Self {
        Self {
            path: path.to_path_buf(),
            error_code: err.code().to_string(),
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// No marker found; nothing on disk changed.
    Untouched,
    /// Marker blocks removed. `output` is the original path when replacing in
    /// place, otherwise the `.clean` sibling.
    Cleaned { output: PathBuf },
    Failed { error: FileFailure },
}

/// Summary after a batch completes.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Resulting artifact paths, in processing order.
    pub cleaned: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    pub files_seen: usize,
    pub untouched: usize,
    pub duration: Duration,
}

impl BatchReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Untouched => self.untouched += 1,
            FileOutcome::Cleaned { output } => self.cleaned.push(output),
            FileOutcome::Failed { error } => self.failures.push(error),
        }
    }

    /// Fold another report into this one (multi-root runs).
    pub fn absorb(&mut self, other: BatchReport) {
        self.cleaned.extend(other.cleaned);
        self.failures.extend(other.failures);
        self.files_seen += other.files_seen;
        self.untouched += other.untouched;
        self.duration += other.duration;
    }

    pub fn cleaned_count(&self) -> usize {
        self.cleaned.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

// ──────────────────── runner ────────────────────

pub struct BatchCleaner<'s> {
    sanitizer: Sanitizer<'s>,
    in_place: bool,
    replace_options: ReplaceOptions,
    config_hash: Option<String>,
    sink: &'s dyn ActivitySink,
}

impl<'s> BatchCleaner<'s> {
    pub fn new(config: &Config, sink: &'s dyn ActivitySink) -> Self {
        Self {
            sanitizer: Sanitizer::new(SanitizerOptions::from(&config.cleaner), sink),
            in_place: config.replace.in_place,
            replace_options: ReplaceOptions::from(&config.replace),
            config_hash: config.stable_hash().ok(),
            sink,
        }
    }

    /// Process one file, converting any error into a `Failed` outcome.
    pub fn clean_file(&self, path: &Path) -> FileOutcome {
        self.sink.record(&ActivityEvent::FileProcessing {
            path: path.to_path_buf(),
        });
        match self.try_clean_file(path) {
            Ok(Some(output)) => FileOutcome::Cleaned { output },
            Ok(None) => FileOutcome::Untouched,
            Err(err) => {
                self.sink.record(&ActivityEvent::FileFailed {
                    path: path.to_path_buf(),
                    error_code: err.code().to_string(),
                    error_message: err.to_string(),
                });
                FileOutcome::Failed {
                    error: FileFailure::from_error(path, &err),
                }
            }
        }
    }

    fn try_clean_file(&self, path: &Path) -> Result<Option<PathBuf>> {
        let outcome = self.sanitizer.run(path)?;
        if !outcome.cleared() {
            return Ok(None);
        }
        let temp = outcome.temp_path;

        if self.in_place {
            replace::replace(path, &temp, self.replace_options, self.sink)?;
            if fs::remove_file(&temp).is_ok() {
                self.sink.record(&ActivityEvent::TempDiscarded { path: temp });
            }
            Ok(Some(path.to_path_buf()))
        } else {
            let dest = replace::clean_path_for(path);
            replace::place_clean_copy(&temp, &dest, self.sink)?;
            Ok(Some(dest))
        }
    }

    /// Process an explicit list of files.
    pub fn clean_paths<I>(&self, root: &Path, files: I) -> BatchReport
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let start = Instant::now();
        self.sink.record(&ActivityEvent::SweepStarted {
            root: root.to_path_buf(),
            config_hash: self.config_hash.clone(),
        });

        let mut report = BatchReport::default();
        for file in files {
            report.record(self.clean_file(&file));
        }
        report.duration = start.elapsed();

        self.sink.record(&ActivityEvent::SweepCompleted {
            root: root.to_path_buf(),
            cleaned: report.cleaned_count(),
            failed: report.failed_count(),
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        });
        report
    }

    /// Walk `root` and process every scene file found.
    ///
    /// Only a failure to walk the root itself is returned as an error.
    pub fn sweep(&self, walker: &DirectoryWalker, root: &Path) -> Result<BatchReport> {
        let files = walker.walk(root)?;
        Ok(self.clean_paths(root, files))
    }
}
