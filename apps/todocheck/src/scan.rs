//! Repository file discovery.
//!
//! Walks the root with `walkdir`, pruning configured directory names and
//! dropping files matched by exclude globs. Paths are returned relative to
//! the root with `/` separators, sorted.

use crate::error::{CheckError, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// A discovered file: absolute path for reading, relative path for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative: String,
}

pub struct FileScanner {
    root: PathBuf,
    skip_dirs: Vec<String>,
    exclude: Vec<Pattern>,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_dirs: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Directory names (not paths) whose subtrees are never entered.
    pub fn skip_dirs(mut self, names: &[String]) -> Self {
        self.skip_dirs = names.to_vec();
        self
    }

    /// Glob patterns matched against the relative path of each file.
    pub fn exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| CheckError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Enumerate all regular files under the root. Unreadable entries are
    /// logged and skipped.
    pub fn scan(&self) -> Vec<ScannedFile> {
        let mut files: Vec<ScannedFile> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !self.is_skipped_dir(e))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let relative = relative_path(&self.root, e.path())?;
                if self.is_excluded(&relative) {
                    return None;
                }
                Some(ScannedFile {
                    path: e.into_path(),
                    relative,
                })
            })
            .collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|n| self.skip_dirs.iter().any(|s| s == n))
                .unwrap_or(false)
    }

    fn is_excluded(&self, relative: &str) -> bool {
        let opts = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.exclude
            .iter()
            .any(|p| p.matches_with(relative, opts))
    }
}

/// Relative, forward-slash form of `path` under `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = pathdiff::diff_paths(path, root)?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
