use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Highest mirror exit code that still means the copy finished.
const LAST_NON_FATAL_EXIT_CODE: i32 = 7;
/// Highest mirror exit code that carries no mismatch or extra-file warnings.
const LAST_CLEAN_EXIT_CODE: i32 = 3;

/// Classification of a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Copied without anomalies (exit 0..=3).
    Clean,
    /// Finished but reported mismatches or extra entries (exit 4..=7).
    CompletedWithWarnings,
    /// At least one copy failure, or the tool was terminated (exit > 7 or none).
    Failed,
}

impl TransferOutcome {
    /// Classify a mirror exit code.
    #[must_use]
    pub const fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(code) if code >= 0 && code <= LAST_CLEAN_EXIT_CODE => Self::Clean,
            Some(code) if code > LAST_CLEAN_EXIT_CODE && code <= LAST_NON_FATAL_EXIT_CODE => {
                Self::CompletedWithWarnings
            }
            _ => Self::Failed,
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::CompletedWithWarnings => "completed_with_warnings",
            Self::Failed => "failed",
        }
    }
}

/// Counts and sizes captured for a single mirror run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Directories seen in the source.
    pub dirs_total: u64,
    /// Directories created at the destination.
    pub dirs_copied: u64,
    /// Files seen in the source.
    pub files_total: u64,
    /// Files copied to the destination.
    pub files_copied: u64,
    /// Bytes copied during this run.
    pub bytes_copied: u64,
    /// Aggregate size of the source tree before the copy.
    pub source_bytes: u64,
    /// Aggregate size of the destination tree after the copy.
    pub destination_bytes: u64,
    /// Raw exit code of the mirror tool.
    pub exit_code: Option<i32>,
    /// Classification derived from the exit code.
    pub outcome: TransferOutcome,
}

/// Parameters for one invocation of the mirror tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    /// Directory to copy from.
    pub source: PathBuf,
    /// Directory to copy into.
    pub destination: PathBuf,
    /// Parallel copy workers.
    pub threads: u16,
    /// Directory names never copied.
    pub exclude_dirs: Vec<String>,
    /// File patterns never copied.
    pub exclude_files: Vec<String>,
    /// Skip files whose destination copy is newer (incremental re-run into existing storage).
    pub existing_target: bool,
    /// List every file and directory in the tool output.
    pub verbose: bool,
    /// Append tool output to this log file as well.
    pub log_path: Option<PathBuf>,
}

/// Raw result of a mirror-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MirrorOutput {
    /// Exit code when the tool terminated normally.
    pub exit_code: Option<i32>,
    /// Captured standard output, including the summary table.
    pub stdout: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_to_outcomes() {
        for code in 0..=3 {
            assert_eq!(
                TransferOutcome::from_exit_code(Some(code)),
                TransferOutcome::Clean
            );
        }
        for code in 4..=7 {
            assert_eq!(
                TransferOutcome::from_exit_code(Some(code)),
                TransferOutcome::CompletedWithWarnings
            );
        }
        assert_eq!(
            TransferOutcome::from_exit_code(Some(8)),
            TransferOutcome::Failed
        );
        assert_eq!(
            TransferOutcome::from_exit_code(Some(-1)),
            TransferOutcome::Failed
        );
        assert_eq!(TransferOutcome::from_exit_code(None), TransferOutcome::Failed);
    }
}
