//! External command execution shared by the production adapters.
//!
//! # Design
//! - Adapters build argument vectors; the runner only spawns and captures.
//! - The runner is a trait so adapter argument construction can be tested with scripted output.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CollaboratorError, CollaboratorResult};

/// Program name used for every PowerShell-backed adapter.
pub const POWERSHELL: &str = "powershell.exe";

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code when the process terminated normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Convert a non-zero exit into [`CollaboratorError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error when the process did not exit with status zero.
    pub fn require_success(self, program: &str, operation: &'static str) -> CollaboratorResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(CollaboratorError::CommandFailed {
                program: program.to_string(),
                operation,
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    /// Non-empty trimmed stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

/// Spawns external programs and captures their output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    async fn run(&self, program: &str, args: &[String]) -> CollaboratorResult<CommandOutput>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> CollaboratorResult<CommandOutput> {
        debug!(program, arg_count = args.len(), "spawning external command");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CollaboratorError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Arguments for a non-interactive PowerShell invocation of `script`.
#[must_use]
pub fn powershell_args(script: &str) -> Vec<String> {
    [
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
        script,
    ]
    .iter()
    .map(|arg| (*arg).to_string())
    .collect()
}

/// Quote a value as a PowerShell single-quoted literal.
#[must_use]
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_quote_doubles_embedded_quotes() {
        assert_eq!(ps_quote("O'Brien"), "'O''Brien'");
        assert_eq!(ps_quote("plain"), "'plain'");
    }

    #[test]
    fn powershell_args_end_with_script() {
        let args = powershell_args("Get-Date");
        assert_eq!(args.first().map(String::as_str), Some("-NoProfile"));
        assert_eq!(args.last().map(String::as_str), Some("Get-Date"));
    }

    #[test]
    fn require_success_reports_exit_code() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: " access denied \n".into(),
        };
        match output.require_success("icacls", "grant") {
            Err(CollaboratorError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "access denied");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn lines_skips_blank_output() {
        let output = CommandOutput {
            code: Some(0),
            stdout: "\r\nF\r\n\r\nG\r\n".into(),
            stderr: String::new(),
        };
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["F", "G"]);
    }

    #[tokio::test]
    async fn system_runner_reports_spawn_failures() {
        let result = SystemProcessRunner
            .run("profmig-definitely-missing-binary", &[])
            .await;
        assert!(matches!(result, Err(CollaboratorError::Spawn { .. })));
    }
}
