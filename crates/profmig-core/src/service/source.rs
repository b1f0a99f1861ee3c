use std::fs;
use std::path::PathBuf;

use crate::error::{CollaboratorError, CollaboratorResult};

/// Supplies the raw profile paths of a batch, in processing order.
pub trait ProfileSource: Send + Sync {
    /// Profile folders to migrate.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be enumerated.
    fn profile_paths(&self) -> CollaboratorResult<Vec<PathBuf>>;
}

/// Fixed list of profile paths supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct StaticProfileSource {
    paths: Vec<PathBuf>,
}

impl StaticProfileSource {
    /// Wrap an explicit list.
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl ProfileSource for StaticProfileSource {
    fn profile_paths(&self) -> CollaboratorResult<Vec<PathBuf>> {
        Ok(self.paths.clone())
    }
}

/// Every sub-directory of a profile share, sorted by name.
#[derive(Debug, Clone)]
pub struct DirectoryProfileSource {
    root: PathBuf,
}

impl DirectoryProfileSource {
    /// List profiles under `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ProfileSource for DirectoryProfileSource {
    fn profile_paths(&self) -> CollaboratorResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| CollaboratorError::io("profile_source.read_dir", &self.root, source))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                CollaboratorError::io("profile_source.read_entry", &self.root, source)
            })?;
            let file_type = entry.file_type().map_err(|source| {
                CollaboratorError::io("profile_source.file_type", entry.path(), source)
            })?;
            if file_type.is_dir() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}
