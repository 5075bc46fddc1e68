//! Local source tree scanning
//!
//! The local tree is the reference every device converges to. It is scanned
//! once per run and then shared read-only by all device tasks, so any
//! filesystem error here aborts the whole run.

use crate::models::LocalFileEntry;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of the local files to mirror, keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct LocalTree {
    pub root: PathBuf,
    pub relative_to: PathBuf,
    files: BTreeMap<String, LocalFileEntry>,
}

impl LocalTree {
    /// Scan `root` recursively
    ///
    /// # Arguments
    /// * `root` - Directory to scan
    /// * `relative_to` - Ancestor of `root` that relative paths are computed from
    /// * `suffixes` - Accepted file suffixes (e.g. `.gcode`); empty accepts all
    ///
    /// Hidden files and directories are skipped and symlinks are not followed.
    pub fn scan(root: &Path, relative_to: &Path, suffixes: &[String]) -> Result<Self> {
        let root = canonical_dir(root)?;
        let relative_to = canonical_dir(relative_to)?;

        if !root.starts_with(&relative_to) {
            return Err(Error::InvalidInput(format!(
                "{} is not inside {}",
                root.display(),
                relative_to.display()
            )));
        }

        let mut tree = Self {
            root: root.clone(),
            relative_to,
            files: BTreeMap::new(),
        };
        tree.scan_recursive(&root, suffixes)?;
        Ok(tree)
    }

    /// Build a tree from already known entries
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LocalFileEntry>,
    {
        Self {
            files: entries
                .into_iter()
                .map(|entry| (entry.relative_path.clone(), entry))
                .collect(),
            ..Self::default()
        }
    }

    fn scan_recursive(&mut self, current: &Path, suffixes: &[String]) -> Result<()> {
        let entries = fs::read_dir(current).map_err(|e| with_path(current, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| with_path(current, e))?;
            let entry_path = entry.path();

            if is_hidden(&entry_path) {
                log::trace!("Skipping hidden entry {}", entry_path.display());
                continue;
            }

            // Does not follow symlinks
            let metadata =
                fs::symlink_metadata(&entry_path).map_err(|e| with_path(&entry_path, e))?;

            if metadata.is_dir() {
                self.scan_recursive(&entry_path, suffixes)?;
            } else if metadata.is_file() {
                if !has_accepted_suffix(&entry_path, suffixes) {
                    continue;
                }

                let modified = metadata
                    .modified()
                    .map_err(|e| with_path(&entry_path, e))?;
                let relative = entry_path.strip_prefix(&self.relative_to).map_err(|_| {
                    Error::InvalidInput(format!(
                        "{} is not inside {}",
                        entry_path.display(),
                        self.relative_to.display()
                    ))
                })?;

                let file_entry = LocalFileEntry {
                    relative_path: normalize_relative(relative),
                    absolute_path: entry_path.clone(),
                    size_bytes: metadata.len(),
                    modified: unix_seconds(modified),
                };
                log::debug!(
                    "Local file: {} (size: {}, mtime: {})",
                    file_entry.relative_path,
                    file_entry.size_bytes,
                    file_entry.modified
                );
                self.files.insert(file_entry.relative_path.clone(), file_entry);
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }

    /// Entries in lexicographic relative path order
    pub fn iter(&self) -> impl Iterator<Item = &LocalFileEntry> {
        self.files.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    if !path.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Path is not a directory: {}",
            path.display()
        )));
    }

    fs::canonicalize(path).map_err(|e| with_path(path, e))
}

fn with_path(path: &Path, error: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        error.kind(),
        format!("{}: {error}", path.display()),
    ))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

fn has_accepted_suffix(path: &Path, suffixes: &[String]) -> bool {
    if suffixes.is_empty() {
        return true;
    }

    let Some(extension) = path.extension() else {
        return false;
    };
    let suffix = format!(".{}", extension.to_string_lossy());
    suffixes
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(&suffix))
}

/// Join the normal components of a relative path with forward slashes
#[must_use]
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
    }
}
