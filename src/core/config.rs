//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SvsError};

/// Full sweeper configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub cleaner: CleanerConfig,
    pub replace: ReplaceConfig,
    pub walker: WalkerSettings,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Sanitizer behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CleanerConfig {
    /// Directory for sanitized temp output. `None` uses the platform temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Keep the temp output even when nothing was removed.
    pub keep_unused_temp: bool,
}

/// What happens to a file once it has been sanitized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplaceConfig {
    /// Overwrite the original instead of writing a `.clean` sibling.
    pub in_place: bool,
    /// Keep the original as `<name>.bkp` when replacing in place. Ignored otherwise.
    pub backup: bool,
    /// Compare digests of the sanitized output and the rewritten original.
    pub verify: bool,
}

/// Directory traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalkerSettings {
    pub recursive: bool,
    pub follow_symlinks: bool,
    pub max_depth: usize,
    pub excluded_paths: Vec<PathBuf>,
    /// Shell-style globs (`*`, `**`, `?`, `[...]`) matched against full paths.
    pub exclude_patterns: Vec<String>,
}

/// Diagnostic output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Optional JSONL activity log.
    pub jsonl_path: Option<PathBuf>,
    pub verbose: bool,
}

/// Filesystem paths used by svs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            in_place: false,
            backup: false,
            verify: true,
        }
    }
}

impl Default for WalkerSettings {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            max_depth: 64,
            excluded_paths: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[SVS-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("svs").join("config.toml"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SvsError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SvsError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SVS_CLEANER_TEMP_DIR") {
            self.cleaner.temp_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("SVS_CLEANER_KEEP_UNUSED_TEMP") {
            self.cleaner.keep_unused_temp = parse_env_bool("SVS_CLEANER_KEEP_UNUSED_TEMP", &raw)?;
        }

        if let Some(raw) = lookup("SVS_REPLACE_IN_PLACE") {
            self.replace.in_place = parse_env_bool("SVS_REPLACE_IN_PLACE", &raw)?;
        }
        if let Some(raw) = lookup("SVS_REPLACE_BACKUP") {
            self.replace.backup = parse_env_bool("SVS_REPLACE_BACKUP", &raw)?;
        }
        if let Some(raw) = lookup("SVS_REPLACE_VERIFY") {
            self.replace.verify = parse_env_bool("SVS_REPLACE_VERIFY", &raw)?;
        }

        if let Some(raw) = lookup("SVS_WALKER_RECURSIVE") {
            self.walker.recursive = parse_env_bool("SVS_WALKER_RECURSIVE", &raw)?;
        }
        if let Some(raw) = lookup("SVS_WALKER_FOLLOW_SYMLINKS") {
            self.walker.follow_symlinks = parse_env_bool("SVS_WALKER_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = lookup("SVS_WALKER_MAX_DEPTH") {
            self.walker.max_depth = parse_env_usize("SVS_WALKER_MAX_DEPTH", &raw)?;
        }

        if let Some(raw) = lookup("SVS_LOGGING_JSONL_PATH") {
            self.logging.jsonl_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("SVS_LOGGING_VERBOSE") {
            self.logging.verbose = parse_env_bool("SVS_LOGGING_VERBOSE", &raw)?;
        }

        Ok(())
    }

    /// Strip trailing slashes so excluded paths compare equal to walked paths.
    fn normalize_paths(&mut self) {
        for path in &mut self.walker.excluded_paths {
            let s = path.to_string_lossy();
            if s.len() > 1
                && let Some(stripped) = s.strip_suffix('/')
            {
                *path = PathBuf::from(stripped);
            }
        }
    }

    /// Reject settings the sweeper cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.walker.max_depth == 0 {
            return Err(SvsError::InvalidConfig {
                details: "walker.max_depth must be >= 1".to_string(),
            });
        }

        if let Some(dir) = &self.cleaner.temp_dir
            && dir.as_os_str().is_empty()
        {
            return Err(SvsError::InvalidConfig {
                details: "cleaner.temp_dir must not be empty".to_string(),
            });
        }

        for pattern in &self.walker.exclude_patterns {
            crate::scanner::walker::validate_glob_pattern(pattern)?;
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>().map_err(|error| SvsError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| SvsError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
