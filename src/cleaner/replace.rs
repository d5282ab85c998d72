//! Replacement protocol: puts sanitized content where the original used to be.
//!
//! The sequence is rename-or-delete, then copy. It is not atomic: if the copy
//! fails after the original was moved aside (or removed), the original path is
//! left empty or missing. With `backup` the untouched bytes remain at
//! `<original>.bkp`; without it they are gone.

#![allow(missing_docs)]

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::config::ReplaceConfig;
use crate::core::errors::{Result, SvsError};
use crate::logger::sink::{ActivityEvent, ActivitySink};

pub const BACKUP_SUFFIX: &str = ".bkp";
pub const CLEAN_SUFFIX: &str = ".clean";

/// `<original>.bkp`
pub fn backup_path_for(original: &Path) -> PathBuf {
    with_suffix(original, BACKUP_SUFFIX)
}

/// `<original>.clean`
pub fn clean_path_for(original: &Path) -> PathBuf {
    with_suffix(original, CLEAN_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Move the original to `<original>.bkp` instead of deleting it.
    pub backup: bool,
    /// Compare SHA-256 digests of source and destination after the copy.
    pub verify: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            backup: false,
            verify: true,
        }
    }
}

impl From<&ReplaceConfig> for ReplaceOptions {
    fn from(config: &ReplaceConfig) -> Self {
        Self {
            backup: config.backup,
            verify: config.verify,
        }
    }
}

/// Replace `old` with the content of `new`.
///
/// On success `old` holds exactly the bytes of `new`, and `new` is untouched.
/// With `options.backup` the previous content of `old` is at
/// [`backup_path_for`]`(old)`; an existing backup is never overwritten.
pub fn replace(
    old: &Path,
    new: &Path,
    options: ReplaceOptions,
    sink: &dyn ActivitySink,
) -> Result<()> {
    if options.backup {
        let backup = backup_path_for(old);
        if backup.symlink_metadata().is_ok() {
            return Err(SvsError::Rename {
                from: old.to_path_buf(),
                to: backup,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "backup already exists"),
            });
        }
        fs::rename(old, &backup).map_err(|source| SvsError::Rename {
            from: old.to_path_buf(),
            to: backup.clone(),
            source,
        })?;
        sink.record(&ActivityEvent::BackupCreated {
            original: old.to_path_buf(),
            backup,
        });
    } else {
        fs::remove_file(old).map_err(|e| SvsError::remove(old, e))?;
        sink.record(&ActivityEvent::OriginalRemoved {
            path: old.to_path_buf(),
        });
    }

    copy_into_new(new, old)?;
    sink.record(&ActivityEvent::ReplacementWritten {
        path: old.to_path_buf(),
        source: new.to_path_buf(),
    });

    if options.verify {
        verify_same_content(new, old)?;
    }
    Ok(())
}

/// Move a sanitized temp file to `dest`, replacing whatever is there.
///
/// Tries a rename first and falls back to copy plus remove when the temp
/// directory lives on another filesystem.
pub fn place_clean_copy(temp: &Path, dest: &Path, sink: &dyn ActivitySink) -> Result<()> {
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(SvsError::remove(dest, e)),
    }

    match fs::rename(temp, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_into_new(temp, dest)?;
            fs::remove_file(temp).map_err(|e| SvsError::remove(temp, e))?;
        }
        Err(source) => {
            return Err(SvsError::Rename {
                from: temp.to_path_buf(),
                to: dest.to_path_buf(),
                source,
            });
        }
    }

    sink.record(&ActivityEvent::CleanCopyPlaced {
        original: temp.to_path_buf(),
        clean: dest.to_path_buf(),
    });
    Ok(())
}

/// Byte copy into a file that must not exist yet.
fn copy_into_new(from: &Path, to: &Path) -> Result<()> {
    let copy_err = |source: io::Error| SvsError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let mut reader = File::open(from).map_err(copy_err)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(copy_err)?;
    io::copy(&mut reader, &mut writer).map_err(copy_err)?;
    writer.sync_all().map_err(copy_err)?;
    Ok(())
}

fn verify_same_content(expected_from: &Path, actual_at: &Path) -> Result<()> {
    let expected = sha256_file(expected_from).map_err(|e| SvsError::read(expected_from, e))?;
    let actual = sha256_file(actual_at).map_err(|e| SvsError::read(actual_at, e))?;
    if expected != actual {
        return Err(SvsError::Verify {
            path: actual_at.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Hex-encoded SHA-256 of a file, streamed.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
