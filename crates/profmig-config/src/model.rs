//! Explicit settings structs for a migration batch.
//!
//! # Design
//! - One struct per component; the orchestrator hands each component only its slice.
//! - Every field has a default so JSON files and CLI flags only carry overrides.

use std::path::PathBuf;
use std::time::Duration;

use profmig_core::{BlockSize, ComponentOrder, DiskFormat};
use serde::{Deserialize, Deserializer, Serialize};

use crate::defaults::{
    DEFAULT_LOG_LEVEL, DEFAULT_SIZE_BYTES, DEFAULT_TRANSFER_THREADS, EXCLUDED_DIRECTORIES,
    EXCLUDED_FILES, HIVE_FILE_NAME, HIVE_RETRY_ATTEMPTS, HIVE_RETRY_DELAY_MS, MOUNT_POLL_ATTEMPTS,
    MOUNT_SETTLE_MS, REGISTRY_SUBTREES, REMOVED_FILES, SERVICE_PRINCIPALS, strings,
};
use crate::validate::parse_size;

/// Complete configuration for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Root directory that receives the per-user containers.
    pub target_root: PathBuf,
    /// Share holding per-user home folders merged into each profile.
    pub home_root: Option<PathBuf>,
    /// Re-process profiles whose migration journal is already complete.
    pub resync_completed: bool,
    /// Identity resolution settings.
    pub identity: IdentitySettings,
    /// Container provisioning settings.
    pub disk: DiskSettings,
    /// Mirror settings.
    pub transfer: TransferSettings,
    /// Post-copy normalization settings.
    pub normalize: NormalizeSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Report and metrics output.
    pub output: OutputSettings,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_root: PathBuf::new(),
            home_root: None,
            resync_completed: false,
            identity: IdentitySettings::default(),
            disk: DiskSettings::default(),
            transfer: TransferSettings::default(),
            normalize: NormalizeSettings::default(),
            logging: LoggingSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Directory search scope and target naming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySettings {
    /// Directory search roots, queried in order.
    pub search_roots: Vec<String>,
    /// Order of identifier and name in the target folder.
    pub component_order: ComponentOrder,
}

/// Container provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskSettings {
    /// Size quota in bytes; JSON accepts a number or a string such as `"30GB"`.
    #[serde(deserialize_with = "deserialize_size")]
    pub size_bytes: u64,
    /// Logical sector size.
    pub block_size: BlockSize,
    /// Container image format.
    pub format: DiskFormat,
    /// Mount designator polls before giving up.
    pub mount_poll_attempts: u32,
    /// Delay between mount designator polls, in milliseconds.
    pub mount_settle_ms: u64,
}

impl DiskSettings {
    /// Delay between mount designator polls.
    #[must_use]
    pub const fn mount_settle(&self) -> Duration {
        Duration::from_millis(self.mount_settle_ms)
    }
}

impl Default for DiskSettings {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_SIZE_BYTES,
            block_size: BlockSize::default(),
            format: DiskFormat::default(),
            mount_poll_attempts: MOUNT_POLL_ATTEMPTS,
            mount_settle_ms: MOUNT_SETTLE_MS,
        }
    }
}

/// Mirror settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    /// Parallel copy workers.
    pub threads: u16,
    /// List every copied entry in the transfer log.
    pub verbose: bool,
    /// Append mirror output to this file.
    pub log_path: Option<PathBuf>,
    /// Directory names never copied.
    pub exclude_dirs: Vec<String>,
    /// File patterns never copied.
    pub exclude_files: Vec<String>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_TRANSFER_THREADS,
            verbose: false,
            log_path: None,
            exclude_dirs: strings(EXCLUDED_DIRECTORIES),
            exclude_files: strings(EXCLUDED_FILES),
        }
    }
}

/// Post-copy normalization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSettings {
    /// Hive file name at the root of the copied profile.
    pub hive_file_name: String,
    /// Registry subtrees deleted from the hive, relative to its root.
    pub registry_keys: Vec<String>,
    /// Globs of files deleted from the copied profile.
    pub remove_files: Vec<String>,
    /// Attempts for hive load and unload.
    pub retry_attempts: u32,
    /// Delay between hive attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Principals granted full control next to the profile owner.
    pub service_principals: Vec<String>,
}

impl NormalizeSettings {
    /// Delay between hive attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            hive_file_name: HIVE_FILE_NAME.to_string(),
            registry_keys: strings(REGISTRY_SUBTREES),
            remove_files: strings(REMOVED_FILES),
            retry_attempts: HIVE_RETRY_ATTEMPTS,
            retry_delay_ms: HIVE_RETRY_DELAY_MS,
            service_principals: strings(SERVICE_PRINCIPALS),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Also write the run log to this file.
    pub log_path: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            log_path: None,
        }
    }
}

/// Report and metrics output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Write the batch report as JSON to this file.
    pub report_path: Option<PathBuf>,
    /// Write Prometheus text metrics to this file.
    pub metrics_path: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeInput {
    Bytes(u64),
    Text(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeInput::deserialize(deserializer)? {
        SizeInput::Bytes(bytes) => Ok(bytes),
        SizeInput::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_denylists_and_registry_subtrees() {
        let config = MigrationConfig::default();
        assert!(config.transfer.exclude_dirs.iter().any(|dir| dir == "$RECYCLE.BIN"));
        assert!(config.transfer.exclude_files.iter().any(|file| file == "*.ost"));
        assert_eq!(config.normalize.hive_file_name, "NTUSER.DAT");
        assert_eq!(config.normalize.retry_attempts, 3);
        assert_eq!(config.normalize.registry_keys.len(), 4);
        assert_eq!(config.disk.block_size, BlockSize::FourK);
    }

    #[test]
    fn size_accepts_numbers_and_unit_strings() -> anyhow::Result<()> {
        let numeric: DiskSettings = serde_json::from_str(r#"{"size_bytes": 1048576}"#)?;
        assert_eq!(numeric.size_bytes, 1_048_576);

        let text: DiskSettings = serde_json::from_str(r#"{"size_bytes": "2GB"}"#)?;
        assert_eq!(text.size_bytes, 2 * 1024 * 1024 * 1024);

        assert!(serde_json::from_str::<DiskSettings>(r#"{"size_bytes": "lots"}"#).is_err());
        Ok(())
    }
}
