//! Per-target migration journal.
//!
//! # Design
//! - One JSON document per target folder under `<target_root>/.profmig/`.
//! - Every step transition is persisted, so an interrupted run leaves a record
//!   of how far the profile got.
//! - `completed` is only set once every step of a run succeeded; it gates the
//!   "already migrated" skip.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use profmig_core::ProfileRecord;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Directory under the target root holding journals.
pub const JOURNAL_DIR_NAME: &str = ".profmig";
const JOURNAL_SUFFIX: &str = ".meta.json";

/// Pipeline steps tracked per profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Create or attach the container.
    Provision,
    /// Mirror the profile tree.
    Transfer,
    /// Merge the home folder into the profile.
    MergeHome,
    /// Ownership and ACL propagation.
    Ownership,
    /// Registry hive normalization.
    Hive,
    /// Post-copy file removal.
    Cleanup,
    /// Detach the container.
    Release,
}

impl StepKind {
    /// Stable label used in journals, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Transfer => "transfer",
            Self::MergeHome => "merge_home",
            Self::Ownership => "ownership",
            Self::Hive => "hive",
            Self::Cleanup => "cleanup",
            Self::Release => "release",
        }
    }
}

/// Status of a journaled step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step began.
    Started,
    /// The step finished.
    Completed,
    /// The step finished with warnings.
    Warned,
    /// The step failed.
    Failed,
    /// The step had nothing to do.
    Skipped,
}

impl StepStatus {
    /// Stable label used in metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Warned => "warned",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One step transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step label.
    pub name: String,
    /// Latest status.
    pub status: StepStatus,
    /// Failure or summary detail.
    pub detail: Option<String>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

/// Persisted state of one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationJournal {
    /// Source profile the target was migrated from.
    pub source_path: String,
    /// Backing-file path.
    pub target_path: String,
    /// Whether a run finished every step.
    pub completed: bool,
    /// Runs that touched this target.
    pub runs: u32,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Steps of the latest run.
    pub steps: Vec<StepRecord>,
    /// Bytes copied across all runs.
    pub bytes_copied: u64,
    #[serde(skip)]
    path: PathBuf,
}

impl MigrationJournal {
    /// Load the journal for `target`, or start an empty one.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] or [`AppError::Json`] when an existing journal
    /// cannot be read.
    pub fn open(target_root: &Path, record: &ProfileRecord, target: &Path) -> AppResult<Self> {
        let path = journal_path(target_root, target);
        if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(|source| AppError::io("journal.read", &path, source))?;
            let mut journal: Self =
                serde_json::from_str(&raw).map_err(|source| AppError::json("journal.parse", &path, source))?;
            journal.path = path;
            return Ok(journal);
        }
        Ok(Self {
            source_path: record.source_path().display().to_string(),
            target_path: target.display().to_string(),
            completed: false,
            runs: 0,
            updated_at: Utc::now(),
            steps: Vec::new(),
            bytes_copied: 0,
            path,
        })
    }

    /// File backing this journal.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Status of `step` in the latest run.
    #[must_use]
    pub fn step_status(&self, step: StepKind) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|record| record.name == step.as_str())
            .map(|record| record.status)
    }

    /// Start a new run: clear the step list and the completion flag.
    ///
    /// # Errors
    ///
    /// Returns an error when the journal cannot be written.
    pub fn begin_run(&mut self) -> AppResult<()> {
        self.runs += 1;
        self.completed = false;
        self.steps.clear();
        self.updated_at = Utc::now();
        self.persist()
    }

    /// Record a step transition. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error when the journal cannot be written.
    pub fn record(&mut self, step: StepKind, status: StepStatus, detail: Option<String>) -> AppResult<bool> {
        let now = Utc::now();
        let mut updated = false;
        if let Some(record) = self.steps.iter_mut().find(|record| record.name == step.as_str()) {
            if record.status != status || record.detail != detail {
                record.status = status;
                record.detail = detail;
                record.updated_at = now;
                updated = true;
            }
        } else {
            self.steps.push(StepRecord {
                name: step.as_str().to_string(),
                status,
                detail,
                updated_at: now,
            });
            updated = true;
        }
        if updated {
            self.updated_at = now;
            self.persist()?;
        }
        Ok(updated)
    }

    /// Add copied bytes to the running total.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes_copied = self.bytes_copied.saturating_add(bytes);
    }

    /// Mark the run complete.
    ///
    /// # Errors
    ///
    /// Returns an error when the journal cannot be written.
    pub fn complete(&mut self) -> AppResult<()> {
        self.completed = true;
        self.updated_at = Utc::now();
        self.persist()
    }

    fn persist(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| AppError::io("journal.create_dir", parent, source))?;
        }
        let serialised = serde_json::to_string_pretty(self)
            .map_err(|source| AppError::json("journal.serialize", &self.path, source))?;
        fs::write(&self.path, serialised).map_err(|source| AppError::io("journal.write", &self.path, source))
    }
}

/// Journal location for a backing file: `<target_root>/.profmig/<target dir>.meta.json`.
#[must_use]
pub fn journal_path(target_root: &Path, target: &Path) -> PathBuf {
    let name = target
        .parent()
        .and_then(Path::file_name)
        .or_else(|| target.file_stem())
        .map_or_else(|| "profile".to_string(), |name| name.to_string_lossy().into_owned());
    target_root
        .join(JOURNAL_DIR_NAME)
        .join(format!("{name}{JOURNAL_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use profmig_core::DiskFormat;
    use profmig_test_support::fixtures::account;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn record(root: &Path) -> (ProfileRecord, PathBuf) {
        let target = root.join("S-1-5-21-1-2-3-1001_jdoe").join("Profile_jdoe.vhdx");
        let record = ProfileRecord::resolved(
            PathBuf::from("/profiles/jdoe.V6"),
            "jdoe".into(),
            None,
            account("S-1-5-21-1-2-3-1001", "jdoe", Some("CORP")),
            target.clone(),
            DiskFormat::Vhdx,
        );
        (record, target)
    }

    #[test]
    fn journal_lives_under_the_target_root() {
        let path = journal_path(
            Path::new("/targets"),
            Path::new("/targets/S-1-5-21-1-2-3-1001_jdoe/Profile_jdoe.vhdx"),
        );
        assert_eq!(
            path,
            Path::new("/targets/.profmig/S-1-5-21-1-2-3-1001_jdoe.meta.json")
        );
    }

    #[test]
    fn completion_survives_reopen() -> TestResult<()> {
        let temp = TempDir::new()?;
        let (record, target) = record(temp.path());

        let mut journal = MigrationJournal::open(temp.path(), &record, &target)?;
        journal.begin_run()?;
        assert!(journal.record(StepKind::Provision, StepStatus::Started, None)?);
        assert!(journal.record(StepKind::Provision, StepStatus::Completed, None)?);
        assert!(!journal.record(StepKind::Provision, StepStatus::Completed, None)?);
        journal.add_bytes(2_048);
        journal.complete()?;

        let reopened = MigrationJournal::open(temp.path(), &record, &target)?;
        assert!(reopened.completed);
        assert_eq!(reopened.runs, 1);
        assert_eq!(reopened.bytes_copied, 2_048);
        assert_eq!(reopened.step_status(StepKind::Provision), Some(StepStatus::Completed));
        Ok(())
    }

    #[test]
    fn new_run_clears_completion() -> TestResult<()> {
        let temp = TempDir::new()?;
        let (record, target) = record(temp.path());
        let mut journal = MigrationJournal::open(temp.path(), &record, &target)?;
        journal.begin_run()?;
        journal.complete()?;

        journal.begin_run()?;

        assert!(!journal.completed);
        assert_eq!(journal.runs, 2);
        assert!(journal.steps.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_journal_is_reported() -> TestResult<()> {
        let temp = TempDir::new()?;
        let (record, target) = record(temp.path());
        let path = journal_path(temp.path(), &target);
        fs::create_dir_all(path.parent().unwrap_or(temp.path()))?;
        fs::write(&path, "{not json")?;

        let result = MigrationJournal::open(temp.path(), &record, &target);

        assert!(matches!(result, Err(AppError::Json { operation: "journal.parse", .. })));
        Ok(())
    }
}
