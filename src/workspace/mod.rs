//! Working directory materialization.
//!
//! Copies the pipeline source tree into the engine's working directory,
//! skipping engine binaries and caches, prior run artifacts and environment
//! manager directories. Exclusions match by entry name at any depth.
//!
//! The copy follows symlinks and copies their targets. Links whose target no
//! longer exists are skipped. Copying over an existing destination replaces
//! files in place, so a re-run into the same directory succeeds.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::WorkspaceError;

/// Summary of a completed materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeResult {
    pub file_count: usize,
    pub dir_count: usize,
    /// Entries skipped by name (each excluded directory counts once).
    pub excluded_count: usize,
    /// Dangling symlinks that were skipped.
    pub skipped_links: usize,
    pub total_size: u64,
}

/// Copies a source tree into a working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    source: PathBuf,
    dest: PathBuf,
    excludes: Vec<String>,
}

impl Workspace {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            excludes: Vec::new(),
        }
    }

    /// Sets the entry names to skip.
    pub fn with_excludes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Checks whether an entry name is excluded.
    pub fn should_exclude(&self, name: &str) -> bool {
        self.excludes.iter().any(|pattern| pattern == name)
    }

    /// Performs the copy.
    pub fn materialize(&self) -> Result<MaterializeResult, WorkspaceError> {
        if !self.source.is_dir() {
            return Err(WorkspaceError::MissingSource(self.source.clone()));
        }

        info!(
            "Materializing workspace {} -> {}",
            self.source.display(),
            self.dest.display()
        );

        fs::create_dir_all(&self.dest).map_err(|source| WorkspaceError::Copy {
            path: self.dest.clone(),
            source,
        })?;

        let mut result = MaterializeResult::default();
        let mut excluded = 0usize;

        let walker = WalkDir::new(&self.source)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let keep = !self.is_excluded_entry(entry);
                if !keep {
                    debug!("Excluding {}", entry.path().display());
                    excluded += 1;
                }
                keep
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => match dangling_link(&err) {
                    Some(path) => {
                        debug!("Skipping dangling symlink {}", path.display());
                        result.skipped_links += 1;
                        continue;
                    }
                    None => return Err(err.into()),
                },
            };

            let Ok(relative) = entry.path().strip_prefix(&self.source) else {
                continue;
            };
            let target = self.dest.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|source| WorkspaceError::Copy {
                    path: target.clone(),
                    source,
                })?;
                result.dir_count += 1;
            } else {
                let bytes = fs::copy(entry.path(), &target).map_err(|source| {
                    WorkspaceError::Copy {
                        path: entry.path().to_path_buf(),
                        source,
                    }
                })?;
                result.file_count += 1;
                result.total_size += bytes;
            }
        }

        result.excluded_count = excluded;
        info!(
            "Workspace ready: {} files, {} directories ({} excluded, {} dangling links skipped)",
            result.file_count, result.dir_count, result.excluded_count, result.skipped_links
        );
        Ok(result)
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map(|name| self.should_exclude(name))
                .unwrap_or(false)
    }
}

/// Returns the link path when `err` comes from a symlink whose target is gone.
fn dangling_link(err: &walkdir::Error) -> Option<PathBuf> {
    if err.loop_ancestor().is_some() {
        return None;
    }
    let path = err.path()?;
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    (is_link && fs::metadata(path).is_err()).then(|| path.to_path_buf())
}
