//! Robocopy mirror adapter and summary parsing.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use profmig_core::{CollaboratorResult, MirrorOutput, MirrorRequest, MirrorTool, ProcessRunner};
use regex::Regex;
use tracing::debug;

/// Mirror tool executable.
pub const ROBOCOPY: &str = "robocopy.exe";

static SUMMARY_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*(dirs|files|bytes)\s*:\s*(.+?)\s*$").expect("summary row pattern to compile")
});

/// Totals from the trailing summary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    /// Directories seen.
    pub dirs_total: u64,
    /// Directories created.
    pub dirs_copied: u64,
    /// Files seen.
    pub files_total: u64,
    /// Files copied.
    pub files_copied: u64,
    /// Bytes seen.
    pub bytes_total: u64,
    /// Bytes copied.
    pub bytes_copied: u64,
}

/// Parse the `Dirs :`, `Files :` and `Bytes :` rows. Missing rows count as zero.
///
/// Byte columns may carry a unit suffix (`1.5 m`); units are powers of 1024.
/// When a row appears several times (appended logs), the last one wins.
#[must_use]
pub fn parse_summary(stdout: &str) -> MirrorSummary {
    let mut summary = MirrorSummary::default();
    for captures in SUMMARY_ROW.captures_iter(stdout) {
        let values = parse_columns(&captures[2]);
        let total = values.first().copied().unwrap_or(0);
        let copied = values.get(1).copied().unwrap_or(0);
        match captures[1].to_ascii_lowercase().as_str() {
            "dirs" => (summary.dirs_total, summary.dirs_copied) = (total, copied),
            "files" => (summary.files_total, summary.files_copied) = (total, copied),
            _ => (summary.bytes_total, summary.bytes_copied) = (total, copied),
        }
    }
    summary
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn parse_columns(row: &str) -> Vec<u64> {
    let mut values: Vec<f64> = Vec::new();
    for token in row.split_whitespace() {
        let multiplier = match token.to_ascii_lowercase().as_str() {
            "k" => Some(1024_f64),
            "m" => Some(1024_f64.powi(2)),
            "g" => Some(1024_f64.powi(3)),
            "t" => Some(1024_f64.powi(4)),
            _ => None,
        };
        match (multiplier, values.last_mut()) {
            (Some(multiplier), Some(last)) => *last *= multiplier,
            (Some(_), None) => {}
            (None, _) => {
                if let Ok(value) = token.replace(',', "").parse::<f64>() {
                    values.push(value);
                }
            }
        }
    }
    values.into_iter().map(|value| value.round().max(0.0) as u64).collect()
}

/// Argument vector for one mirror pass.
#[must_use]
pub fn robocopy_args(request: &MirrorRequest) -> Vec<String> {
    let mut args = vec![
        request.source.display().to_string(),
        request.destination.display().to_string(),
        "/E".to_string(),
        "/COPYALL".to_string(),
        "/R:2".to_string(),
        "/W:1".to_string(),
        format!("/MT:{}", request.threads),
        "/XJ".to_string(),
    ];
    if !request.exclude_dirs.is_empty() {
        args.push("/XD".to_string());
        args.extend(request.exclude_dirs.iter().cloned());
    }
    if !request.exclude_files.is_empty() {
        args.push("/XF".to_string());
        args.extend(request.exclude_files.iter().cloned());
    }
    if request.existing_target {
        args.push("/XO".to_string());
    }
    if request.verbose {
        args.push("/V".to_string());
    } else {
        args.push("/NFL".to_string());
        args.push("/NDL".to_string());
    }
    if let Some(log_path) = &request.log_path {
        args.push(format!("/LOG+:{}", log_path.display()));
        args.push("/TEE".to_string());
    }
    args
}

/// Mirror tool backed by `robocopy`.
pub struct RobocopyTool {
    runner: Arc<dyn ProcessRunner>,
}

impl RobocopyTool {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MirrorTool for RobocopyTool {
    async fn mirror(&self, request: &MirrorRequest) -> CollaboratorResult<MirrorOutput> {
        let args = robocopy_args(request);
        debug!(
            source = %request.source.display(),
            destination = %request.destination.display(),
            existing_target = request.existing_target,
            "running mirror"
        );
        // Robocopy exit codes are a bit field; classification happens in the engine.
        let output = self.runner.run(ROBOCOPY, &args).await?;
        Ok(MirrorOutput {
            exit_code: output.code,
            stdout: output.stdout,
        })
    }
}
