//! File sanitizer: streams a scene file through the segmenter and writes every
//! block that does not carry the marker to a fresh temp file.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use memchr::memmem::Finder;

use crate::cleaner::blocks::BlockReader;
use crate::core::config::CleanerConfig;
use crate::core::errors::{Result, SvsError};
use crate::logger::sink::{ActivityEvent, ActivitySink};

/// Bytes whose presence anywhere in a block marks it for removal.
pub const MARKER: &[u8] = b"vaccine";

#[derive(Debug, Clone, Default)]
pub struct SanitizerOptions {
    /// `None` uses `std::env::temp_dir()`.
    pub temp_dir: Option<PathBuf>,
    /// Leave the temp output on disk even when nothing was removed.
    pub keep_unused_temp: bool,
}

impl From<&CleanerConfig> for SanitizerOptions {
    fn from(config: &CleanerConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            keep_unused_temp: config.keep_unused_temp,
        }
    }
}

/// Result of sanitizing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOutcome {
    /// Absolute path of the input.
    pub input: PathBuf,
    /// `<temp_dir>/<basename(input)>`. Only guaranteed to exist when
    /// [`cleared`](Self::cleared) is true or unused temps are kept.
    pub temp_path: PathBuf,
    pub blocks_kept: usize,
    pub blocks_removed: usize,
    pub bytes_written: u64,
}

impl SanitizeOutcome {
    pub fn cleared(&self) -> bool {
        self.blocks_removed > 0
    }

    /// The deliverable: the temp path if anything was removed.
    pub fn into_cleaned_path(self) -> Option<PathBuf> {
        if self.cleared() {
            Some(self.temp_path)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    kept: usize,
    removed: usize,
    bytes: u64,
}

pub struct Sanitizer<'s> {
    options: SanitizerOptions,
    finder: Finder<'static>,
    sink: &'s dyn ActivitySink,
}

impl<'s> Sanitizer<'s> {
    pub fn new(options: SanitizerOptions, sink: &'s dyn ActivitySink) -> Self {
        Self {
            options,
            finder: Finder::new(MARKER),
            sink,
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.options
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Where the sanitized copy of `input` is written.
    pub fn temp_path_for(&self, input: &Path) -> Result<PathBuf> {
        let name = input.file_name().ok_or_else(|| {
            SvsError::read(
                input,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        Ok(self.temp_dir().join(name))
    }

    /// Sanitize one file.
    ///
    /// Both handles are closed before this returns, and on success the temp
    /// file has been flushed and synced so it can be copied right away.
    pub fn run(&self, input: &Path) -> Result<SanitizeOutcome> {
        let input = std::path::absolute(input).map_err(|e| SvsError::read(input, e))?;
        let temp_path = self.temp_path_for(&input)?;

        // Writing the temp over the input would destroy it before it is read.
        let resolved = fs::canonicalize(&input).map_err(|e| SvsError::read(&input, e))?;
        if temp_path == input || resolves_to(&temp_path, &resolved) {
            return Err(SvsError::write(
                &temp_path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "temp path coincides with the input file",
                ),
            ));
        }

        if temp_path.symlink_metadata().is_ok() {
            fs::remove_file(&temp_path).map_err(|e| SvsError::write(&temp_path, e))?;
        }

        let tally = match self.write_survivors(&input, &temp_path) {
            Ok(tally) => tally,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        if tally.removed > 0 {
            self.sink.record(&ActivityEvent::FileCleared {
                path: input.clone(),
                blocks_removed: tally.removed,
                blocks_kept: tally.kept,
            });
        } else if !self.options.keep_unused_temp && fs::remove_file(&temp_path).is_ok() {
            self.sink.record(&ActivityEvent::TempDiscarded {
                path: temp_path.clone(),
            });
        }

        Ok(SanitizeOutcome {
            input,
            temp_path,
            blocks_kept: tally.kept,
            blocks_removed: tally.removed,
            bytes_written: tally.bytes,
        })
    }

    fn write_survivors(&self, input: &Path, temp_path: &Path) -> Result<Tally> {
        let source = File::open(input).map_err(|e| SvsError::read(input, e))?;
        let target = File::create(temp_path).map_err(|e| SvsError::write(temp_path, e))?;
        let mut out = BufWriter::new(target);
        let mut tally = Tally::default();

        for block in BlockReader::new(BufReader::new(source)) {
            let block = block.map_err(|e| SvsError::read(input, e))?;
            if self.finder.find(block.as_bytes()).is_some() {
                tally.removed += 1;
                continue;
            }
            out.write_all(block.as_bytes())
                .and_then(|()| out.write_all(b"\n"))
                .map_err(|e| SvsError::write(temp_path, e))?;
            tally.kept += 1;
            tally.bytes += block.as_bytes().len() as u64 + 1;
        }

        let target = out
            .into_inner()
            .map_err(|e| SvsError::write(temp_path, e.into_error()))?;
        target
            .sync_all()
            .map_err(|e| SvsError::write(temp_path, e))?;
        Ok(tally)
    }
}

/// True when `path` names `target` once its directory is resolved.
fn resolves_to(path: &Path, target: &Path) -> bool {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return false;
    };
    fs::canonicalize(dir).is_ok_and(|dir| dir.join(name) == target)
}

/// Sanitize `input` into `temp_dir` (platform temp dir when `None`).
///
/// Returns the sanitized temp path only if at least one block was removed.
pub fn sanitize(
    input: &Path,
    temp_dir: Option<&Path>,
    sink: &dyn ActivitySink,
) -> Result<Option<PathBuf>> {
    let options = SanitizerOptions {
        temp_dir: temp_dir.map(Path::to_path_buf),
        keep_unused_temp: false,
    };
    Ok(Sanitizer::new(options, sink).run(input)?.into_cleaned_path())
}
