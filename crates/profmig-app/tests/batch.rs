use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use profmig_app::{
    ALREADY_MIGRATED, BootstrapDependencies, Collaborators, PLAN_STAGE, journal_path, run_app_with,
};
use profmig_config::MigrationConfig;
use profmig_core::{AccountIdentity, BatchReport, StaticProfileSource};
use profmig_events::{Event, EventBus};
use profmig_telemetry::Metrics;
use profmig_test_support::fixtures::{STANDARD_PROFILE, account, write_profile};
use profmig_test_support::mocks::{
    CopyingMirror, FakeBlockStorage, FakeDirectory, FakeHiveStore, FakeTranslator, RecordingAclEditor,
    StorageCall,
};
use tempfile::TempDir;

const SEARCH_ROOT: &str = "LDAP://DC=corp,DC=example";
const JDOE_SID: &str = "S-1-5-21-1004336348-1177238915-682003330-1001";
const ASMITH_SID: &str = "S-1-5-21-1004336348-1177238915-682003330-1002";
const SETTLED_PROFILE: &[(&str, &str)] = &[
    ("NTUSER.DAT", "hive"),
    ("Documents/report.txt", "quarterly numbers"),
];

struct Harness {
    temp: TempDir,
    directory: Arc<FakeDirectory>,
    translator: Arc<FakeTranslator>,
    storage: Arc<FakeBlockStorage>,
    mirror: Arc<CopyingMirror>,
    acl: Arc<RecordingAclEditor>,
    hive: Arc<FakeHiveStore>,
}

struct Run {
    report: BatchReport,
    events: EventBus,
    metrics: Metrics,
}

fn jdoe() -> AccountIdentity {
    account(JDOE_SID, "jdoe", Some("CORP"))
}

fn asmith() -> AccountIdentity {
    account(ASMITH_SID, "asmith", Some("CORP"))
}

impl Harness {
    fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let storage = FakeBlockStorage::new(temp.path().join("mounts"));
        Ok(Self::with_storage(temp, storage))
    }

    fn with_storage(temp: TempDir, storage: FakeBlockStorage) -> Self {
        Self {
            directory: Arc::new(FakeDirectory::new().with_account(SEARCH_ROOT, &jdoe())),
            translator: Arc::new(FakeTranslator::new().with_account(jdoe()).with_account(asmith())),
            storage: Arc::new(storage),
            mirror: Arc::new(CopyingMirror::new()),
            acl: Arc::new(RecordingAclEditor::new()),
            hive: Arc::new(FakeHiveStore::new().with_keys(&[
                "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\User Shell Folders",
            ])),
            temp,
        }
    }

    fn profiles(&self) -> PathBuf {
        self.temp.path().join("profiles")
    }

    fn target_root(&self) -> PathBuf {
        self.temp.path().join("migrated")
    }

    fn profile(&self, folder: &str) -> Result<PathBuf> {
        Ok(write_profile(&self.profiles(), folder, STANDARD_PROFILE)?)
    }

    fn profile_with(&self, folder: &str, files: &[(&str, &str)]) -> Result<PathBuf> {
        Ok(write_profile(&self.profiles(), folder, files)?)
    }

    fn target_for(&self, identity: &AccountIdentity) -> PathBuf {
        self.target_root()
            .join(format!("{}_{}", identity.sid, identity.account_name))
            .join(format!("Profile_{}.vhdx", identity.account_name))
    }

    fn config(&self) -> MigrationConfig {
        let mut config = MigrationConfig {
            target_root: self.target_root(),
            ..MigrationConfig::default()
        };
        config.identity.search_roots = vec![SEARCH_ROOT.to_string()];
        config.disk.mount_settle_ms = 0;
        config.normalize.retry_delay_ms = 0;
        config
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            directory: self.directory.clone(),
            translator: self.translator.clone(),
            storage: self.storage.clone(),
            mirror: self.mirror.clone(),
            acl: self.acl.clone(),
            hive: self.hive.clone(),
        }
    }

    async fn run(&self, config: MigrationConfig, sources: Vec<PathBuf>) -> Result<Run> {
        let dependencies = BootstrapDependencies::new(
            config,
            Box::new(StaticProfileSource::new(sources)),
            self.collaborators(),
        )?;
        let events = dependencies.events().clone();
        let metrics = dependencies.metrics().clone();
        let report = run_app_with(dependencies).await?;
        Ok(Run {
            report,
            events,
            metrics,
        })
    }
}

fn bucket_sum(report: &BatchReport) -> usize {
    report.succeeded().len()
        + report.completed_with_warnings().len()
        + report.skipped().len()
        + report.failed().len()
        + report.unresolvable().len()
}

#[tokio::test]
async fn resolved_profile_lands_in_identifier_first_target() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile(&format!("jdoe.{JDOE_SID}.V6"))?;

    let run = harness.run(harness.config(), vec![source.clone()]).await?;

    assert_eq!(run.report.succeeded(), [source.display().to_string()]);
    let target = harness.target_for(&jdoe());
    assert!(target.is_file());
    let profile_root = harness.storage.mount_dir(&target).join("Profile");
    assert!(profile_root.join("Documents").join("report.txt").is_file());
    assert!(!profile_root.join("AppData/Local/Microsoft/Outlook/mail.ost").exists());
    assert!(!profile_root.join("AppData/Local/Temp/cache.tmp").exists());
    assert!(!harness.storage.is_attached(&target));
    assert!(harness.hive.mounted().is_empty());
    assert!(harness
        .hive
        .deleted_keys()
        .iter()
        .any(|key| key.ends_with("Explorer\\User Shell Folders")));
    assert_eq!(run.metrics.profile_count("succeeded"), 1);
    Ok(())
}

#[tokio::test]
async fn unresolvable_profile_is_never_attempted() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile("ghost.V6")?;

    let run = harness.run(harness.config(), vec![source.clone()]).await?;

    assert_eq!(run.report.unresolvable(), [source.display().to_string()]);
    assert_eq!(run.report.eligible(), 0);
    assert!(harness.storage.calls().is_empty());
    assert!(harness.mirror.requests().is_empty());
    assert!(harness.acl.calls().is_empty());
    let history = run.events.history_for(&source.display().to_string());
    let kinds: Vec<&str> = history.iter().map(|envelope| envelope.event.kind()).collect();
    assert_eq!(kinds, ["profile_started", "profile_finished"]);
    let started = history.into_iter().find_map(|envelope| match envelope.event {
        Event::ProfileStarted { target, .. } => Some(target),
        _ => None,
    });
    assert_eq!(started.as_deref(), Some("Cannot Copy"));
    Ok(())
}

#[tokio::test]
async fn existing_storage_is_attached_and_copied_incrementally() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile("jdoe.V6")?;
    let target = harness.target_for(&jdoe());
    fs::create_dir_all(target.parent().unwrap_or(Path::new(".")))?;
    fs::write(&target, b"container")?;

    let run = harness.run(harness.config(), vec![source]).await?;

    assert_eq!(run.report.succeeded().len(), 1);
    assert_eq!(harness.storage.initialize_count(), 0);
    assert!(harness.storage.calls().contains(&StorageCall::Attach(target.clone())));
    let requests = harness.mirror.requests();
    assert!(requests[0].existing_target);
    Ok(())
}

#[tokio::test]
async fn failed_transfer_fails_the_profile_and_the_batch_continues() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = FakeBlockStorage::new(temp.path().join("mounts"));
    let mut harness = Harness::with_storage(temp, storage);
    let jdoe_source = harness.profile("jdoe.V6")?;
    let asmith_source = harness.profile("asmith")?;
    harness.mirror = Arc::new(CopyingMirror::new().with_exit_code_for(&jdoe_source, Some(8)));

    let run = harness
        .run(harness.config(), vec![jdoe_source.clone(), asmith_source.clone()])
        .await?;

    let failed = run.report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, jdoe_source.display().to_string());
    assert_eq!(failed[0].stage, "transfer");
    assert!(failed[0].message.contains("exit code 8"));
    assert_eq!(run.report.succeeded(), [asmith_source.display().to_string()]);
    assert!(!harness.storage.is_attached(&harness.target_for(&jdoe())));
    Ok(())
}

#[tokio::test]
async fn every_profile_lands_in_exactly_one_bucket() -> Result<()> {
    let harness = Harness::new()?;
    let jdoe_source = harness.profile("jdoe.V6")?;
    let ghost = harness.profile("ghost")?;
    let sources = vec![jdoe_source, ghost, PathBuf::new(), harness.profiles().join("asmith")];

    let run = harness.run(harness.config(), sources.clone()).await?;

    assert_eq!(run.report.total(), sources.len());
    assert_eq!(bucket_sum(&run.report), run.report.total());
    assert_eq!(run.report.eligible(), 2);
    assert_eq!(run.report.succeeded().len(), 1);
    assert_eq!(run.report.unresolvable().len(), 1);
    let stages: Vec<&str> = run.report.failed().iter().map(|f| f.stage.as_str()).collect();
    assert_eq!(stages, [PLAN_STAGE, "transfer"]);
    let kinds: Vec<&str> = run
        .events
        .backlog()
        .iter()
        .map(|envelope| envelope.event.kind())
        .filter(|kind| *kind == "batch_started" || *kind == "batch_completed")
        .collect();
    assert_eq!(kinds, ["batch_started", "batch_completed"]);
    Ok(())
}

#[tokio::test]
async fn empty_path_is_not_counted_as_eligible() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile("jdoe.V6")?;

    let run = harness.run(harness.config(), vec![source, PathBuf::new()]).await?;

    assert_eq!(run.report.total(), 2);
    assert_eq!(run.report.eligible(), 1);
    assert_eq!(run.report.succeeded().len(), 1);
    assert_eq!(run.report.failed().len(), 1);
    assert_eq!(run.report.failed()[0].stage, PLAN_STAGE);
    assert!(run.report.unresolvable().is_empty());
    Ok(())
}

#[tokio::test]
async fn completed_targets_are_skipped_until_resync() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile_with("jdoe.V6", SETTLED_PROFILE)?;

    let first = harness.run(harness.config(), vec![source.clone()]).await?;
    assert_eq!(first.report.succeeded().len(), 1);
    assert!(first.metrics.snapshot().bytes_transferred_total > 0);
    assert!(journal_path(&harness.target_root(), &harness.target_for(&jdoe())).is_file());

    let second = harness.run(harness.config(), vec![source.clone()]).await?;
    assert_eq!(second.report.skipped(), [source.display().to_string()]);
    assert_eq!(harness.mirror.requests().len(), 1);
    let reason = second
        .events
        .history_for(&source.display().to_string())
        .into_iter()
        .find_map(|envelope| match envelope.event {
            Event::ProfileFinished { detail, .. } => detail,
            _ => None,
        });
    assert_eq!(reason.as_deref(), Some(ALREADY_MIGRATED));

    let mut resync = harness.config();
    resync.resync_completed = true;
    let third = harness.run(resync, vec![source]).await?;
    assert_eq!(third.report.succeeded().len(), 1);
    assert_eq!(third.metrics.snapshot().bytes_transferred_total, 0);
    assert!(harness.mirror.requests()[1].existing_target);
    assert_eq!(harness.storage.initialize_count(), 1);
    Ok(())
}

#[tokio::test]
async fn hive_left_mounted_is_reported_as_a_warning() -> Result<()> {
    let harness = {
        let mut harness = Harness::new()?;
        harness.hive = Arc::new(FakeHiveStore::new().failing_unloads(10));
        harness
    };
    let source = harness.profile("jdoe.V6")?;

    let run = harness.run(harness.config(), vec![source]).await?;

    let warned = run.report.completed_with_warnings();
    assert_eq!(warned.len(), 1);
    assert!(warned[0].warnings.iter().any(|warning| warning.starts_with("[hive_left_mounted]")));
    assert!(run.report.succeeded().is_empty());
    assert_eq!(harness.hive.mounted().len(), 1);
    assert_eq!(run.metrics.snapshot().hive_retries_total, 2);
    Ok(())
}

#[tokio::test]
async fn detach_failure_does_not_change_the_outcome() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = FakeBlockStorage::new(temp.path().join("mounts")).failing_detach();
    let harness = Harness::with_storage(temp, storage);
    let source = harness.profile("jdoe.V6")?;

    let run = harness.run(harness.config(), vec![source]).await?;

    assert_eq!(run.report.succeeded().len(), 1);
    assert!(harness
        .storage
        .calls()
        .iter()
        .any(|call| matches!(call, StorageCall::Detach(_))));
    Ok(())
}

#[tokio::test]
async fn report_and_metrics_files_are_written() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile("jdoe.V6")?;
    let mut config = harness.config();
    let report_path = harness.temp.path().join("out").join("report.json");
    let metrics_path = harness.temp.path().join("out").join("metrics.prom");
    config.output.report_path = Some(report_path.clone());
    config.output.metrics_path = Some(metrics_path.clone());

    harness.run(config, vec![source]).await?;

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["total"], 1);
    assert_eq!(report["succeeded"].as_array().map(Vec::len), Some(1));
    let metrics = fs::read_to_string(&metrics_path)?;
    assert!(metrics.contains("profmig_profiles_total"));
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_is_rejected_before_any_profile() -> Result<()> {
    let harness = Harness::new()?;
    let source = harness.profile("jdoe.V6")?;
    let mut config = harness.config();
    config.identity.search_roots.clear();

    let dependencies = BootstrapDependencies::new(
        config,
        Box::new(StaticProfileSource::new(vec![source])),
        harness.collaborators(),
    )?;
    let result = run_app_with(dependencies).await;

    assert!(result.is_err_and(|err| err.is_configuration()));
    assert!(harness.translator.lookups().is_empty());
    Ok(())
}
