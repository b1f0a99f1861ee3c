//! Offline normalization of the per-user registry hive.
//!
//! # Design
//! - The hive is loaded under a namespace that is unique per invocation, so a
//!   hive left mounted by an earlier failure never collides with a new load.
//! - Load and unload retry with a fixed delay; everything else is single-shot.
//! - Nothing here fails the profile: problems come back as [`NormalizeError`]s.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use profmig_config::NormalizeSettings;
use profmig_config::defaults::HIVE_NAMESPACE_PREFIX;
use profmig_core::{CollaboratorError, CollaboratorResult, HiveStore, ProcessRunner};
use tracing::{debug, info, warn};

use crate::error::NormalizeError;

/// Registry editing executable.
pub const REG: &str = "reg.exe";

/// Namespace the hive is loaded under for an invocation started at `now`.
#[must_use]
pub fn namespace_for(now: DateTime<Utc>) -> String {
    format!("{HIVE_NAMESPACE_PREFIX}{}", now.format("%Y%m%d%H%M%S%3f"))
}

/// [`HiveStore`] backed by `reg`.
pub struct RegHiveStore {
    runner: Arc<dyn ProcessRunner>,
}

impl RegHiveStore {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    async fn reg(&self, operation: &'static str, args: Vec<String>) -> CollaboratorResult<()> {
        debug!(operation, "running reg");
        self.runner
            .run(REG, &args)
            .await?
            .require_success(REG, operation)
            .map(drop)
    }
}

#[async_trait]
impl HiveStore for RegHiveStore {
    async fn load(&self, namespace: &str, hive_file: &Path) -> CollaboratorResult<()> {
        let args = vec![
            "load".to_string(),
            namespace.to_string(),
            hive_file.display().to_string(),
        ];
        self.reg("load hive", args).await
    }

    async fn unload(&self, namespace: &str) -> CollaboratorResult<()> {
        self.reg("unload hive", vec!["unload".to_string(), namespace.to_string()])
            .await
    }

    async fn key_exists(&self, key: &str) -> CollaboratorResult<bool> {
        let args = ["query".to_string(), key.to_string()];
        let output = self.runner.run(REG, &args).await?;
        // `reg query` exits 1 for a missing key; anything else is a real failure.
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            code => Err(CollaboratorError::CommandFailed {
                program: REG.to_string(),
                operation: "query key",
                code,
                stderr: output.stderr,
            }),
        }
    }

    async fn delete_key(&self, key: &str) -> CollaboratorResult<()> {
        let args = vec!["delete".to_string(), key.to_string(), "/f".to_string()];
        self.reg("delete key", args).await
    }
}

/// Result of one hive normalization pass.
#[derive(Debug, Default)]
pub struct HiveReport {
    /// The profile had no hive file.
    pub skipped: bool,
    /// Namespace used for this pass.
    pub namespace: String,
    /// Fully qualified subtrees removed.
    pub removed_keys: Vec<String>,
    /// Load and unload attempts beyond the first.
    pub retries: u32,
    /// Steps that failed.
    pub warnings: Vec<NormalizeError>,
}

/// Removes configured subtrees from a copied profile's hive.
pub struct HiveNormalizer {
    store: Arc<dyn HiveStore>,
    hive_file_name: String,
    registry_keys: Vec<String>,
    attempts: u32,
    delay: Duration,
}

impl HiveNormalizer {
    /// Build a normalizer from the normalization settings.
    #[must_use]
    pub fn new(store: Arc<dyn HiveStore>, settings: &NormalizeSettings) -> Self {
        Self {
            store,
            hive_file_name: settings.hive_file_name.clone(),
            registry_keys: settings.registry_keys.clone(),
            attempts: settings.retry_attempts.max(1),
            delay: settings.retry_delay(),
        }
    }

    /// Hive file expected at the root of `profile_root`.
    #[must_use]
    pub fn hive_path(&self, profile_root: &Path) -> PathBuf {
        profile_root.join(&self.hive_file_name)
    }

    /// Normalize the hive under `profile_root`.
    pub async fn normalize(&self, profile_root: &Path) -> HiveReport {
        let hive = self.hive_path(profile_root);
        let mut report = HiveReport {
            namespace: namespace_for(Utc::now()),
            ..HiveReport::default()
        };
        if !hive.is_file() {
            info!(hive = %hive.display(), "no hive in profile; skipping registry normalization");
            report.skipped = true;
            return report;
        }
        let namespace = report.namespace.clone();

        let (loaded, attempts) = self
            .with_retry("load hive", || self.store.load(&namespace, &hive))
            .await;
        report.retries += attempts - 1;
        if let Err(source) = loaded {
            report.warnings.push(NormalizeError::HiveLoad {
                hive,
                attempts,
                source,
            });
            return report;
        }

        for relative in &self.registry_keys {
            let key = format!("{namespace}\\{relative}");
            match self.remove_subtree(&key).await {
                Ok(true) => report.removed_keys.push(key),
                Ok(false) => debug!(key = %key, "subtree absent"),
                Err(source) => {
                    warn!(key = %key, error = %source, "subtree removal failed");
                    report.warnings.push(NormalizeError::Subtree { key, source });
                }
            }
        }

        let (unloaded, attempts) = self
            .with_retry("unload hive", || self.store.unload(&namespace))
            .await;
        report.retries += attempts - 1;
        if let Err(source) = unloaded {
            warn!(namespace = %namespace, attempts, "hive left mounted");
            report.warnings.push(NormalizeError::HiveLeftMounted {
                namespace,
                attempts,
                source,
            });
            return report;
        }

        if let Err(source) = self.remove_namespace_root(&namespace).await {
            report
                .warnings
                .push(NormalizeError::NamespaceRoot { namespace, source });
        }

        info!(
            namespace = %report.namespace,
            removed = report.removed_keys.len(),
            retries = report.retries,
            "hive normalized"
        );
        report
    }

    async fn remove_subtree(&self, key: &str) -> CollaboratorResult<bool> {
        if !self.store.key_exists(key).await? {
            return Ok(false);
        }
        self.store.delete_key(key).await?;
        Ok(true)
    }

    async fn remove_namespace_root(&self, namespace: &str) -> CollaboratorResult<()> {
        if self.store.key_exists(namespace).await? {
            debug!(namespace, "namespace root survived unload");
            self.store.delete_key(namespace).await?;
        }
        Ok(())
    }

    async fn with_retry<F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> (CollaboratorResult<()>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CollaboratorResult<()>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(()) => return (Ok(()), attempt),
                Err(error) if attempt >= self.attempts => return (Err(error), attempt),
                Err(error) => {
                    warn!(operation, attempt, error = %error, "hive operation failed; retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use profmig_core::CommandOutput;
    use profmig_test_support::fixtures::{STANDARD_PROFILE, write_profile};
    use profmig_test_support::mocks::{FakeHiveStore, ScriptedRunner};
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    const SHELL_FOLDERS: &str =
        "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\User Shell Folders";

    fn settings() -> NormalizeSettings {
        NormalizeSettings {
            retry_delay_ms: 0,
            ..NormalizeSettings::default()
        }
    }

    #[test]
    fn namespace_carries_millisecond_timestamp() -> TestResult<()> {
        let now = Utc
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid timestamp"))?
            + chrono::Duration::milliseconds(42);
        assert_eq!(namespace_for(now), "HKU\\PROFMIG_20240309140507042");
        Ok(())
    }

    #[tokio::test]
    async fn configured_subtrees_are_removed_and_hive_unloaded() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;
        let store = Arc::new(FakeHiveStore::new().with_keys(&[SHELL_FOLDERS, "Software\\Keep"]));
        let normalizer = HiveNormalizer::new(store.clone(), &settings());

        let report = normalizer.normalize(&profile).await;

        assert!(report.warnings.is_empty());
        assert_eq!(report.removed_keys, [format!("{}\\{SHELL_FOLDERS}", report.namespace)]);
        assert!(store.mounted().is_empty());
        assert_eq!(report.retries, 0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_hive_is_a_skip() -> TestResult<()> {
        let temp = TempDir::new()?;
        let store = Arc::new(FakeHiveStore::new());
        let normalizer = HiveNormalizer::new(store.clone(), &settings());

        let report = normalizer.normalize(temp.path()).await;

        assert!(report.skipped);
        assert_eq!(store.load_attempts(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn transient_load_failures_are_retried() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;
        let store = Arc::new(FakeHiveStore::new().failing_loads(2));
        let normalizer = HiveNormalizer::new(store.clone(), &settings());

        let report = normalizer.normalize(&profile).await;

        assert!(report.warnings.is_empty());
        assert_eq!(store.load_attempts(), 3);
        assert_eq!(report.retries, 2);
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_unload_reports_hive_left_mounted() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;
        let store = Arc::new(FakeHiveStore::new().failing_unloads(5));
        let normalizer = HiveNormalizer::new(store.clone(), &settings());

        let report = normalizer.normalize(&profile).await;

        assert_eq!(store.unload_attempts(), 3);
        assert!(matches!(
            report.warnings.as_slice(),
            [NormalizeError::HiveLeftMounted { attempts: 3, .. }]
        ));
        assert_eq!(store.mounted(), [report.namespace.clone()]);
        Ok(())
    }

    #[tokio::test]
    async fn surviving_namespace_root_is_deleted() -> TestResult<()> {
        let temp = TempDir::new()?;
        let profile = write_profile(temp.path(), "Profile", STANDARD_PROFILE)?;
        let store = Arc::new(FakeHiveStore::new().keeping_root_after_unload());
        let normalizer = HiveNormalizer::new(store.clone(), &settings());

        let report = normalizer.normalize(&profile).await;

        assert!(report.warnings.is_empty());
        assert_eq!(store.deleted_keys(), [report.namespace.clone()]);
        Ok(())
    }

    #[tokio::test]
    async fn reg_query_distinguishes_missing_keys_from_failures() -> TestResult<()> {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "ERROR: The system was unable to find the specified registry key".into(),
        });
        runner.push(CommandOutput {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        });
        let store = RegHiveStore::new(runner.clone());

        assert!(!store.key_exists("HKU\\PROFMIG_1\\Software").await?);
        assert!(store.key_exists("HKU\\PROFMIG_1\\Software").await.is_err());
        assert_eq!(runner.calls()[0].1, ["query", "HKU\\PROFMIG_1\\Software"]);
        Ok(())
    }
}
