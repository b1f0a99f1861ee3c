//! Validation helpers and parsing utilities for migration settings.

use crate::defaults::{MAX_SIZE_BYTES, MAX_TRANSFER_THREADS, MIN_SIZE_BYTES};
use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;

const UNITS: &[(&str, u64)] = &[
    ("TB", 1024 * 1024 * 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

/// Parse a size such as `30GB`, `512 MB` or `1048576` into bytes (binary multiples).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for empty, non-numeric or overflowing input.
pub fn parse_size(value: &str) -> ConfigResult<u64> {
    let normalized = value.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(ConfigError::invalid("size", "empty", value));
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            normalized
                .strip_suffix(suffix)
                .map(|number| (number.trim(), *multiplier))
        })
        .unwrap_or((normalized.as_str(), 1));

    let amount = number
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid("size", "not_a_number", value))?;
    amount
        .checked_mul(multiplier)
        .ok_or_else(|| ConfigError::invalid("size", "overflow", value))
}

/// Render a byte count with the largest whole unit.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    UNITS
        .iter()
        .find(|(_, multiplier)| bytes >= *multiplier && bytes % multiplier == 0)
        .map_or_else(
            || format!("{bytes}B"),
            |(suffix, multiplier)| format!("{}{suffix}", bytes / multiplier),
        )
}

impl MigrationConfig {
    /// Check the configuration before any profile is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first invalid field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.target_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "target_root",
                reason: "required",
                value: None,
            });
        }

        if self.identity.search_roots.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "identity.search_roots",
                reason: "at least one search root is required",
                value: None,
            });
        }
        if let Some(root) = self
            .identity
            .search_roots
            .iter()
            .find(|root| root.trim().is_empty())
        {
            return Err(ConfigError::invalid("identity.search_roots", "empty_entry", root));
        }

        if !(MIN_SIZE_BYTES..=MAX_SIZE_BYTES).contains(&self.disk.size_bytes) {
            return Err(ConfigError::invalid(
                "disk.size_bytes",
                "outside supported range (3MB..64TB)",
                self.disk.size_bytes,
            ));
        }
        if self.disk.mount_poll_attempts < 2 {
            return Err(ConfigError::invalid(
                "disk.mount_poll_attempts",
                "at least two polls are needed to observe a stable set",
                self.disk.mount_poll_attempts,
            ));
        }

        if !(1..=MAX_TRANSFER_THREADS).contains(&self.transfer.threads) {
            return Err(ConfigError::invalid(
                "transfer.threads",
                "must be between 1 and 128",
                self.transfer.threads,
            ));
        }

        if self.normalize.hive_file_name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "normalize.hive_file_name",
                "empty",
                &self.normalize.hive_file_name,
            ));
        }
        if let Some(key) = self.normalize.registry_keys.iter().find(|key| {
            let trimmed = key.trim();
            trimmed.is_empty() || trimmed.to_ascii_uppercase().starts_with("HK")
        }) {
            return Err(ConfigError::invalid(
                "normalize.registry_keys",
                "must be a non-empty path relative to the hive root",
                key,
            ));
        }
        if let Some(pattern) = self
            .normalize
            .remove_files
            .iter()
            .find(|pattern| pattern.trim().is_empty())
        {
            return Err(ConfigError::invalid("normalize.remove_files", "empty_pattern", pattern));
        }
        if self.normalize.retry_attempts == 0 {
            return Err(ConfigError::invalid(
                "normalize.retry_attempts",
                "must be at least 1",
                self.normalize.retry_attempts,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> MigrationConfig {
        let mut config = MigrationConfig {
            target_root: PathBuf::from("E:\\Migrated"),
            ..MigrationConfig::default()
        };
        config.identity.search_roots = vec!["OU=Users,DC=corp,DC=example".into()];
        config
    }

    #[test]
    fn parse_size_handles_units_and_whitespace() -> ConfigResult<()> {
        assert_eq!(parse_size("30GB")?, 30 * 1024 * 1024 * 1024);
        assert_eq!(parse_size(" 512 mb ")?, 512 * 1024 * 1024);
        assert_eq!(parse_size("1TB")?, 1024 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("4096")?, 4096);
        assert_eq!(parse_size("10B")?, 10);
        Ok(())
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("GB").is_err());
        assert!(parse_size("1.5GB").is_err());
        assert!(parse_size("99999999999TB").is_err());
    }

    #[test]
    fn format_size_uses_largest_whole_unit() {
        assert_eq!(format_size(30 * 1024 * 1024 * 1024), "30GB");
        assert_eq!(format_size(1536), "1536B");
        assert_eq!(format_size(2048), "2KB");
    }

    #[test]
    fn validate_accepts_complete_config() -> ConfigResult<()> {
        valid_config().validate()
    }

    #[test]
    fn validate_requires_search_roots() {
        let mut config = valid_config();
        config.identity.search_roots.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "identity.search_roots",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_absolute_registry_keys() {
        let mut config = valid_config();
        config.normalize.registry_keys = vec!["HKCU\\Software\\Example".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "normalize.registry_keys",
                ..
            })
        ));
    }

    #[test]
    fn validate_bounds_threads_and_size() {
        let mut config = valid_config();
        config.transfer.threads = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.disk.size_bytes = 1024;
        assert!(config.validate().is_err());
    }
}
