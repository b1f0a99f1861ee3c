//! Mirror a profile tree into a container and account for what moved.
//!
//! # Design
//! - The engine measures the source before the copy and the destination after
//!   it, honoring the same denylists the mirror tool receives.
//! - Classification comes from the mirror exit code; a failed pass is an error
//!   that still carries its accounting.
//! - Existing-target mode is incremental: only newer source files are copied.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use profmig_config::TransferSettings;
use profmig_core::{MirrorRequest, MirrorTool, TransferOutcome, TransferResult};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::TransferError;
use crate::robocopy::parse_summary;
use crate::rules::{ExclusionRules, RuleDecision};

/// Folder inside the profile that receives the merged home directory.
pub const HOME_FOLDER_DESTINATION: &str = "Documents";

/// Runs mirror passes with the configured denylists.
pub struct TransferEngine {
    tool: Arc<dyn MirrorTool>,
    rules: ExclusionRules,
    settings: TransferSettings,
}

impl TransferEngine {
    /// Build the engine and compile the denylists.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Rules`] when a denylist pattern is invalid.
    pub fn new(tool: Arc<dyn MirrorTool>, settings: &TransferSettings) -> Result<Self, TransferError> {
        let rules = ExclusionRules::new(&settings.exclude_dirs, &settings.exclude_files)?;
        Ok(Self {
            tool,
            rules,
            settings: settings.clone(),
        })
    }

    /// Mirror `source` into `destination`.
    ///
    /// # Errors
    ///
    /// - [`TransferError::MissingSource`] when `source` is not a directory.
    /// - [`TransferError::Mirror`] when the tool could not be run.
    /// - [`TransferError::Failed`] when the tool reported a failed pass.
    /// - IO and traversal errors while preparing or measuring.
    pub async fn mirror(
        &self,
        source: &Path,
        destination: &Path,
        existing_target: bool,
    ) -> Result<TransferResult, TransferError> {
        if !source.is_dir() {
            return Err(TransferError::MissingSource {
                path: source.to_path_buf(),
            });
        }
        let source_bytes = self.measure(source, "measure source")?;
        fs::create_dir_all(destination)
            .map_err(|source| TransferError::io("create destination", destination, source))?;

        let request = MirrorRequest {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            threads: self.settings.threads,
            exclude_dirs: self.settings.exclude_dirs.clone(),
            exclude_files: self.settings.exclude_files.clone(),
            existing_target,
            verbose: self.settings.verbose,
            log_path: self.settings.log_path.clone(),
        };
        let output = self
            .tool
            .mirror(&request)
            .await
            .map_err(|source| TransferError::Mirror { source })?;

        let summary = parse_summary(&output.stdout);
        let destination_bytes = self.measure(destination, "measure destination")?;
        let result = TransferResult {
            dirs_total: summary.dirs_total,
            dirs_copied: summary.dirs_copied,
            files_total: summary.files_total,
            files_copied: summary.files_copied,
            bytes_copied: summary.bytes_copied,
            source_bytes,
            destination_bytes,
            exit_code: output.exit_code,
            outcome: TransferOutcome::from_exit_code(output.exit_code),
        };

        match result.outcome {
            TransferOutcome::Failed => {
                return Err(TransferError::Failed {
                    result: Box::new(result),
                });
            }
            TransferOutcome::CompletedWithWarnings => warn!(
                source = %source.display(),
                exit_code = ?result.exit_code,
                "mirror reported mismatches or extra entries"
            ),
            TransferOutcome::Clean => {}
        }
        info!(
            source = %source.display(),
            destination = %destination.display(),
            files_copied = result.files_copied,
            bytes_copied = result.bytes_copied,
            source_bytes = result.source_bytes,
            destination_bytes = result.destination_bytes,
            outcome = result.outcome.as_str(),
            "mirror finished"
        );
        Ok(result)
    }

    /// Merge `<home_root>/<username>` into the profile's documents folder.
    ///
    /// Returns `Ok(None)` when the user has no home folder.
    ///
    /// # Errors
    ///
    /// Same as [`TransferEngine::mirror`].
    pub async fn merge_home(
        &self,
        home_root: &Path,
        username: &str,
        profile_root: &Path,
        existing_target: bool,
    ) -> Result<Option<TransferResult>, TransferError> {
        let home = home_root.join(username);
        if !home.is_dir() {
            info!(home = %home.display(), "no home folder to merge");
            return Ok(None);
        }
        let destination: PathBuf = profile_root.join(HOME_FOLDER_DESTINATION);
        self.mirror(&home, &destination, existing_target).await.map(Some)
    }

    fn measure(&self, root: &Path, operation: &'static str) -> Result<u64, TransferError> {
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || self.rules.evaluate_dir(Path::new(entry.file_name())) == RuleDecision::Include
        });

        let mut total = 0_u64;
        for entry in walker {
            let entry = entry.map_err(|source| TransferError::Walkdir {
                operation,
                path: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file()
                || self.rules.evaluate_file(Path::new(entry.file_name())) == RuleDecision::Skip
            {
                continue;
            }
            let metadata = entry.metadata().map_err(|source| TransferError::Walkdir {
                operation,
                path: entry.path().to_path_buf(),
                source,
            })?;
            total += metadata.len();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profmig_test_support::fixtures::{STANDARD_PROFILE, write_profile};
    use profmig_test_support::mocks::CopyingMirror;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn engine(mirror: Arc<CopyingMirror>) -> TestResult<TransferEngine> {
        Ok(TransferEngine::new(mirror, &TransferSettings::default())?)
    }

    #[tokio::test]
    async fn first_pass_copies_everything_but_denylisted_files() -> TestResult<()> {
        let temp = TempDir::new()?;
        let source = write_profile(temp.path(), "jdoe.V6", STANDARD_PROFILE)?;
        let destination = temp.path().join("mount").join("Profile");
        let mirror = Arc::new(CopyingMirror::new());

        let result = engine(mirror.clone())?.mirror(&source, &destination, false).await?;

        assert_eq!(result.outcome, TransferOutcome::Clean);
        assert!(destination.join("Documents").join("report.txt").is_file());
        assert!(!destination.join("AppData/Local/Microsoft/Outlook/mail.ost").exists());
        assert_eq!(result.source_bytes, result.destination_bytes);
        assert_eq!(result.files_copied, 4);
        assert!(!mirror.requests()[0].existing_target);
        Ok(())
    }

    #[tokio::test]
    async fn rerun_into_existing_target_copies_nothing() -> TestResult<()> {
        let temp = TempDir::new()?;
        let source = write_profile(temp.path(), "jdoe", STANDARD_PROFILE)?;
        let destination = temp.path().join("Profile");
        let mirror = Arc::new(CopyingMirror::new());
        let engine = engine(mirror.clone())?;

        engine.mirror(&source, &destination, false).await?;
        let rerun = engine.mirror(&source, &destination, true).await?;

        assert_eq!(rerun.bytes_copied, 0);
        assert_eq!(rerun.files_copied, 0);
        assert_eq!(rerun.outcome, TransferOutcome::Clean);
        assert!(mirror.requests()[1].existing_target);
        Ok(())
    }

    #[tokio::test]
    async fn failing_exit_code_is_an_error_with_accounting() -> TestResult<()> {
        let temp = TempDir::new()?;
        let source = write_profile(temp.path(), "jdoe", STANDARD_PROFILE)?;
        let mirror = Arc::new(CopyingMirror::new().with_exit_code_for(&source, Some(8)));

        let result = engine(mirror)?
            .mirror(&source, &temp.path().join("Profile"), false)
            .await;

        match result {
            Err(TransferError::Failed { result }) => {
                assert_eq!(result.exit_code, Some(8));
                assert_eq!(result.outcome, TransferOutcome::Failed);
            }
            other => anyhow::bail!("expected failed transfer, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_is_rejected_before_the_tool_runs() -> TestResult<()> {
        let temp = TempDir::new()?;
        let mirror = Arc::new(CopyingMirror::new());

        let result = engine(mirror.clone())?
            .mirror(&temp.path().join("absent"), &temp.path().join("Profile"), false)
            .await;

        assert!(matches!(result, Err(TransferError::MissingSource { .. })));
        assert!(mirror.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn home_folder_merges_into_documents() -> TestResult<()> {
        let temp = TempDir::new()?;
        let home_root = temp.path().join("homes");
        write_profile(&home_root, "jdoe", &[("taxes.xlsx", "2024")])?;
        let profile_root = temp.path().join("Profile");
        let engine = engine(Arc::new(CopyingMirror::new()))?;

        let merged = engine.merge_home(&home_root, "jdoe", &profile_root, false).await?;
        let absent = engine.merge_home(&home_root, "asmith", &profile_root, false).await?;

        assert!(merged.is_some());
        assert!(absent.is_none());
        assert!(profile_root.join(HOME_FOLDER_DESTINATION).join("taxes.xlsx").is_file());
        Ok(())
    }
}
