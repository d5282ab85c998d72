//! Sequential directory walker that collects `.ma` scene files.
//!
//! Output is sorted, so repeated runs over the same tree process files in the
//! same order. Unreadable directories are skipped silently; only a missing or
//! unreadable root is reported to the caller.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::config::WalkerSettings;
use crate::core::errors::{Result, SvsError};

/// File extension (without the dot) that marks a scene file.
pub const SCENE_EXTENSION: &str = "ma";

/// Walker configuration derived from `WalkerSettings`.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub recursive: bool,
    pub max_depth: usize,
    pub follow_symlinks: bool,
    pub excluded_paths: HashSet<PathBuf>,
    pub exclude_patterns: Vec<Regex>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 64,
            follow_symlinks: false,
            excluded_paths: HashSet::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Compile glob patterns and collect exclusions from the config file form.
    pub fn from_settings(settings: &WalkerSettings) -> Result<Self> {
        let exclude_patterns = settings
            .exclude_patterns
            .iter()
            .map(|p| glob_to_regex(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            recursive: settings.recursive,
            max_depth: settings.max_depth,
            follow_symlinks: settings.follow_symlinks,
            excluded_paths: settings.excluded_paths.iter().cloned().collect(),
            exclude_patterns,
        })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.contains(path) {
            return true;
        }
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let text = path.to_string_lossy().replace('\\', "/");
        self.exclude_patterns.iter().any(|re| re.is_match(&text))
    }
}

/// True when `path` has exactly the `ma` extension (case-sensitive).
pub fn is_scene_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(SCENE_EXTENSION))
}

pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Collect every scene file under `root`.
    ///
    /// A root that is itself a scene file yields just that file. Any other
    /// non-directory root yields nothing.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let meta = fs::metadata(root).map_err(|source| SvsError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        if self.config.is_excluded(root) {
            return Ok(Vec::new());
        }
        if !meta.is_dir() {
            return Ok(if is_scene_file(root) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let mut found = Vec::new();
        let mut visited = HashSet::new();
        if self.config.follow_symlinks
            && let Ok(canonical) = fs::canonicalize(root)
        {
            visited.insert(canonical);
        }
        self.visit(root, 0, &mut visited, &mut found);
        found.sort();
        Ok(found)
    }

    fn visit(
        &self,
        dir: &Path,
        depth: usize,
        visited: &mut HashSet<PathBuf>,
        found: &mut Vec<PathBuf>,
    ) {
        // Permission denied or vanished mid-walk: skip quietly.
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if self.config.is_excluded(&path) {
                continue;
            }
            let Ok(ft) = entry.file_type() else {
                continue;
            };

            let is_dir = if ft.is_symlink() {
                // Symlinked files are candidates even when dangling; symlinked
                // directories are only entered when following links.
                let target_is_dir = fs::metadata(&path).is_ok_and(|m| m.is_dir());
                if target_is_dir && !self.config.follow_symlinks {
                    continue;
                }
                target_is_dir
            } else {
                ft.is_dir()
            };

            if is_dir {
                if self.config.recursive && depth < self.config.max_depth {
                    subdirs.push(path);
                }
            } else if is_scene_file(&path) {
                found.push(path);
            }
        }

        for sub in subdirs {
            if self.config.follow_symlinks {
                // Cycle guard for symlinked directory loops.
                let Ok(canonical) = fs::canonicalize(&sub) else {
                    continue;
                };
                if !visited.insert(canonical) {
                    continue;
                }
            }
            self.visit(&sub, depth + 1, visited, found);
        }
    }
}

/// Check that a glob compiles.
pub fn validate_glob_pattern(pattern: &str) -> Result<()> {
    glob_to_regex(pattern).map(|_| ())
}

/// Convert a shell-style glob pattern to an anchored regex.
///
/// Supports:
/// - `**` → matches any path (including separators)
/// - `*`  → matches anything except `/`
/// - `?`  → matches a single character except `/`
/// - `[abc]`, `[!abc]` → character classes
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let normalized_pattern = pattern.replace('\\', "/");
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    regex_str.push('^');

    let chars: Vec<char> = normalized_pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            '[' => {
                regex_str.push('[');
                i += 1;
                if i < chars.len() && chars[i] == '!' {
                    regex_str.push('^');
                    i += 1;
                }
            }
            ']' => {
                regex_str.push(']');
                i += 1;
            }
            '.' | '+' | '(' | ')' | '{' | '}' | '^' | '$' | '|' => {
                regex_str.push('\\');
                regex_str.push(chars[i]);
                i += 1;
            }
            c => {
                regex_str.push(c);
                i += 1;
            }
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| SvsError::InvalidConfig {
        details: format!("invalid glob pattern {pattern:?}: {err}"),
    })
}
