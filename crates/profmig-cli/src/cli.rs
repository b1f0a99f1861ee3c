//! Argument parsing, configuration overrides and batch dispatch.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use profmig_app::AppError;
use profmig_config::{MigrationConfig, load_file, parse_size};
use profmig_core::{
    BlockSize, ComponentOrder, DirectoryProfileSource, DiskFormat, ProfileSource, StaticProfileSource,
};

use crate::output;

/// CLI-level error type to distinguish invalid input from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => output::EXIT_CONFIGURATION,
            Self::Failure(_) => output::EXIT_INCOMPLETE,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<AppError> for CliError {
    fn from(error: AppError) -> Self {
        if error.is_configuration() {
            Self::Validation(format!("{:#}", anyhow::Error::new(error)))
        } else {
            Self::failure(error)
        }
    }
}

/// Parses CLI arguments, runs the batch and prints the summary. Returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli) -> CliResult<i32> {
    let config = build_config(&cli)?;
    config
        .validate()
        .map_err(|err| CliError::validation(format!("{:#}", anyhow::Error::new(err))))?;
    let source = profile_source(&cli)?;

    let report = profmig_app::run_app(config, source).await?;
    output::render_summary(&report);
    Ok(output::exit_code(&report))
}

#[derive(Parser)]
#[command(name = "profmig", about = "Migrate roaming profiles into per-user virtual disk containers")]
pub(crate) struct Cli {
    /// Profile folder to migrate; repeat for several.
    #[arg(long = "profile-path", env = "PROFMIG_PROFILE_PATH", value_delimiter = ',')]
    profile_paths: Vec<PathBuf>,
    /// Directory whose immediate subdirectories are migrated.
    #[arg(long, env = "PROFMIG_PROFILE_ROOT", conflicts_with = "profile_paths")]
    profile_root: Option<PathBuf>,
    /// Root of per-user home folders merged into `Documents`.
    #[arg(long = "home-path", env = "PROFMIG_HOME_PATH")]
    home_path: Option<PathBuf>,
    /// Root directory for container targets.
    #[arg(long, env = "PROFMIG_TARGET")]
    target: Option<PathBuf>,
    /// Container size quota, e.g. `30GB`.
    #[arg(long, env = "PROFMIG_SIZE", value_parser = parse_size_arg)]
    size: Option<u64>,
    /// Logical sector size of new containers.
    #[arg(long = "block-size", env = "PROFMIG_BLOCK_SIZE", value_parser = parse_block_size)]
    block_size: Option<BlockSize>,
    /// Directory search root; repeat for several, queried in order.
    #[arg(long = "search-root", env = "PROFMIG_SEARCH_ROOT", value_delimiter = ';')]
    search_roots: Vec<String>,
    /// Append the run log to this file.
    #[arg(long = "log-path", env = "PROFMIG_LOG_PATH")]
    log_path: Option<PathBuf>,
    /// Append mirror tool output to this file.
    #[arg(long = "transfer-log-path", env = "PROFMIG_TRANSFER_LOG_PATH")]
    transfer_log_path: Option<PathBuf>,
    /// Registry subtree to remove from migrated hives; replaces the defaults.
    #[arg(long = "registry-key", env = "PROFMIG_REGISTRY_KEY", value_delimiter = ';')]
    registry_keys: Vec<String>,
    /// File pattern to remove after the copy; replaces the defaults.
    #[arg(long = "remove-file", env = "PROFMIG_REMOVE_FILE", value_delimiter = ';')]
    remove_files: Vec<String>,
    /// Create legacy `.vhd` images instead of `.vhdx`.
    #[arg(long, env = "PROFMIG_VHD")]
    vhd: bool,
    /// Keep per-file mirror output.
    #[arg(long = "verbose-transfer", env = "PROFMIG_VERBOSE_TRANSFER")]
    verbose_transfer: bool,
    /// Name target folders `<name>_<sid>` instead of `<sid>_<name>`.
    #[arg(long = "name-first", env = "PROFMIG_NAME_FIRST")]
    name_first: bool,
    /// Re-copy profiles whose targets already completed.
    #[arg(long, env = "PROFMIG_RESYNC")]
    resync: bool,
    /// Mirror tool worker threads.
    #[arg(long, env = "PROFMIG_THREADS")]
    threads: Option<u16>,
    /// Write the batch report as JSON to this file.
    #[arg(long = "report-path", env = "PROFMIG_REPORT_PATH")]
    report_path: Option<PathBuf>,
    /// Write Prometheus metrics to this file.
    #[arg(long = "metrics-path", env = "PROFMIG_METRICS_PATH")]
    metrics_path: Option<PathBuf>,
    /// JSON configuration file; flags override its values.
    #[arg(long, env = "PROFMIG_CONFIG")]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long = "log-format", env = "PROFMIG_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormatArg>,
    /// Log filter directive, e.g. `info` or `profmig_app=debug`.
    #[arg(long = "log-level", env = "PROFMIG_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

fn parse_size_arg(input: &str) -> Result<u64, String> {
    parse_size(input).map_err(|err| format!("invalid size '{input}': {err}"))
}

fn parse_block_size(input: &str) -> Result<BlockSize, String> {
    input
        .parse::<BlockSize>()
        .map_err(|_| format!("invalid block size '{input}': expected 4K or 512"))
}

/// Start from the configuration file (or defaults) and apply every flag that was given.
pub(crate) fn build_config(cli: &Cli) -> CliResult<MigrationConfig> {
    let mut config = match &cli.config {
        Some(path) => load_file(path).map_err(|err| CliError::validation(format!("{:#}", anyhow::Error::new(err))))?,
        None => MigrationConfig::default(),
    };

    if let Some(target) = &cli.target {
        config.target_root.clone_from(target);
    }
    if let Some(home) = &cli.home_path {
        config.home_root = Some(home.clone());
    }
    if cli.resync {
        config.resync_completed = true;
    }
    if !cli.search_roots.is_empty() {
        config.identity.search_roots.clone_from(&cli.search_roots);
    }
    if cli.name_first {
        config.identity.component_order = ComponentOrder::NameFirst;
    }
    if let Some(size) = cli.size {
        config.disk.size_bytes = size;
    }
    if let Some(block_size) = cli.block_size {
        config.disk.block_size = block_size;
    }
    if cli.vhd {
        config.disk.format = DiskFormat::Vhd;
    }
    if let Some(threads) = cli.threads {
        config.transfer.threads = threads;
    }
    if cli.verbose_transfer {
        config.transfer.verbose = true;
    }
    if let Some(path) = &cli.transfer_log_path {
        config.transfer.log_path = Some(path.clone());
    }
    if !cli.registry_keys.is_empty() {
        config.normalize.registry_keys.clone_from(&cli.registry_keys);
    }
    if !cli.remove_files.is_empty() {
        config.normalize.remove_files.clone_from(&cli.remove_files);
    }
    if let Some(path) = &cli.log_path {
        config.logging.log_path = Some(path.clone());
    }
    if let Some(format) = cli.log_format {
        config.logging.json = format == LogFormatArg::Json;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(path) = &cli.report_path {
        config.output.report_path = Some(path.clone());
    }
    if let Some(path) = &cli.metrics_path {
        config.output.metrics_path = Some(path.clone());
    }
    Ok(config)
}

pub(crate) fn profile_source(cli: &Cli) -> CliResult<Box<dyn ProfileSource>> {
    if !cli.profile_paths.is_empty() {
        return Ok(Box::new(StaticProfileSource::new(cli.profile_paths.clone())));
    }
    match &cli.profile_root {
        Some(root) if root.is_dir() => Ok(Box::new(DirectoryProfileSource::new(root.clone()))),
        Some(root) => Err(CliError::failure(anyhow!(
            "profile root {} is not a directory",
            root.display()
        ))),
        None => Err(CliError::validation(
            "provide --profile-path or --profile-root to select profiles",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["profmig"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).expect("arguments should parse")
    }

    #[test]
    fn flags_override_defaults() -> CliResult<()> {
        let cli = parse(&[
            "--profile-path",
            "\\\\srv\\U\\jdoe.V6",
            "--target",
            "E:\\Migrated",
            "--size",
            "30GB",
            "--block-size",
            "512",
            "--search-root",
            "LDAP://DC=corp,DC=example",
            "--search-root",
            "LDAP://DC=legacy,DC=example",
            "--vhd",
            "--name-first",
            "--resync",
            "--threads",
            "16",
            "--log-format",
            "json",
        ]);
        let config = build_config(&cli)?;

        assert_eq!(config.target_root, PathBuf::from("E:\\Migrated"));
        assert_eq!(config.disk.size_bytes, 30 * 1024 * 1024 * 1024);
        assert_eq!(config.disk.block_size, BlockSize::Legacy512);
        assert_eq!(config.disk.format, DiskFormat::Vhd);
        assert_eq!(config.identity.component_order, ComponentOrder::NameFirst);
        assert_eq!(config.identity.search_roots.len(), 2);
        assert!(config.resync_completed);
        assert_eq!(config.transfer.threads, 16);
        assert!(config.logging.json);
        Ok(())
    }

    #[test]
    fn overrides_replace_default_lists() -> CliResult<()> {
        let cli = parse(&[
            "--profile-path",
            "p",
            "--registry-key",
            "Software\\Vendor\\Cache",
            "--remove-file",
            "**/*.bak",
        ]);
        let config = build_config(&cli)?;
        assert_eq!(config.normalize.registry_keys, ["Software\\Vendor\\Cache"]);
        assert_eq!(config.normalize.remove_files, ["**/*.bak"]);
        Ok(())
    }

    #[test]
    fn unset_flags_keep_file_values() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("profmig.json");
        fs::write(
            &path,
            serde_json::to_string(&serde_json::json!({
                "target_root": "/srv/containers",
                "identity": { "search_roots": ["LDAP://DC=corp,DC=example"] }
            }))?,
        )?;
        let path_arg = path.display().to_string();
        let cli = parse(&["--config", &path_arg, "--profile-path", "p", "--resync"]);

        let config = build_config(&cli).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(config.target_root, PathBuf::from("/srv/containers"));
        assert_eq!(config.identity.search_roots, ["LDAP://DC=corp,DC=example"]);
        assert!(config.resync_completed);
        Ok(())
    }

    #[test]
    fn unreadable_config_file_is_a_validation_error() {
        let cli = parse(&["--config", "/nonexistent/profmig.json"]);
        let err = build_config(&cli).err();
        assert!(matches!(err, Some(CliError::Validation(_))));
        assert_eq!(err.map(|err| err.exit_code()), Some(2));
    }

    #[test]
    fn invalid_block_size_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["profmig", "--block-size", "1K"]).is_err());
        assert!(Cli::try_parse_from(["profmig", "--size", "lots"]).is_err());
    }

    #[test]
    fn profile_source_requires_a_selection() {
        let cli = parse(&["--target", "E:\\Migrated"]);
        let err = profile_source(&cli).err();
        assert!(matches!(err, Some(CliError::Validation(_))));
    }

    #[test]
    fn profile_root_lists_subdirectories() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::create_dir(temp.path().join("jdoe.V6"))?;
        let root = temp.path().display().to_string();
        let cli = parse(&["--profile-root", &root]);

        let source = profile_source(&cli).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(source.profile_paths()?, vec![temp.path().join("jdoe.V6")]);
        Ok(())
    }

    #[test]
    fn profile_path_and_root_conflict() {
        assert!(Cli::try_parse_from(["profmig", "--profile-path", "a", "--profile-root", "b"]).is_err());
    }
}
