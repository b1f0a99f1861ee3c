//! Post-copy removal of files that should not follow the user.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::NormalizeError;
use crate::rules::{RemovalRules, RuleDecision};

/// Outcome of a removal pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Files deleted.
    pub removed: usize,
    /// Entries that matched but could not be removed.
    pub failures: Vec<NormalizeError>,
}

/// Delete files under `root` matching `rules`, then prune directories the
/// pass emptied when they match as well.
///
/// Traversal errors are logged and skipped.
#[must_use]
pub fn remove_matching(root: &Path, rules: &RemovalRules) -> CleanupReport {
    let mut report = CleanupReport::default();
    if rules.is_empty() || !root.is_dir() {
        return report;
    }

    let mut files = Vec::new();
    let mut directories = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, path = %root.display(), "failed to traverse profile for cleanup");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_path_buf();
        if entry.file_type().is_dir() {
            directories.push((entry.depth(), entry.into_path(), relative));
        } else {
            files.push((entry.into_path(), relative));
        }
    }

    for (path, relative) in files {
        if rules.evaluate(&relative) == RuleDecision::Include {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed file");
                report.removed += 1;
            }
            Err(source) => {
                warn!(error = %source, path = %path.display(), "failed to remove file");
                report.failures.push(NormalizeError::Cleanup { path, source });
            }
        }
    }

    directories.sort_by_key(|(depth, _, _)| *depth);
    directories.reverse();
    for (_, path, relative) in directories {
        if rules.evaluate(&relative) == RuleDecision::Skip && is_empty_dir(&path) {
            if let Err(source) = fs::remove_dir(&path) {
                warn!(error = %source, path = %path.display(), "failed to remove directory");
                report.failures.push(NormalizeError::Cleanup { path, source });
            }
        }
    }

    report
}

fn is_empty_dir(path: &Path) -> bool {
    match path.read_dir() {
        Ok(mut entries) => entries.next().is_none(),
        Err(err) => {
            warn!(error = %err, path = %path.display(), "failed to read directory");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profmig_test_support::fixtures::{STANDARD_PROFILE, write_profile};
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn matching_files_are_removed_and_parent_directories_kept() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;
        fs::write(profile.join("Desktop").join("Thumbs.db"), b"cache")?;
        let rules = RemovalRules::new(&["AppData/Local/Temp/**".to_string(), "**/Thumbs.db".to_string()])?;

        let report = remove_matching(&profile, &rules);

        assert!(report.failures.is_empty());
        assert_eq!(report.removed, 2);
        assert!(!profile.join("AppData/Local/Temp/cache.tmp").exists());
        assert!(!profile.join("Desktop/Thumbs.db").exists());
        assert!(profile.join("Desktop/notes.txt").is_file());
        assert!(profile.join("AppData/Local/Temp").is_dir());
        Ok(())
    }

    #[test]
    fn empty_rules_leave_the_tree_alone() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;

        let report = remove_matching(&profile, &RemovalRules::new(&[])?);

        assert_eq!(report.removed, 0);
        assert!(profile.join("AppData/Local/Temp/cache.tmp").is_file());
        Ok(())
    }
}
