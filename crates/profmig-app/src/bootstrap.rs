use std::fs;
use std::path::Path;
use std::sync::Arc;

use profmig_config::MigrationConfig;
use profmig_core::{
    AccountTranslator, AclEditor, BatchReport, BlockStorage, DirectoryService, HiveStore, MirrorTool,
    ProcessRunner, ProfileSource, SystemProcessRunner,
};
use profmig_disk::{DiskProvisioner, MountPolicy, PowerShellBlockStorage};
use profmig_events::EventBus;
use profmig_fsops::{
    HiveNormalizer, IcaclsEditor, OwnershipPropagator, RegHiveStore, RemovalRules, RobocopyTool, TransferEngine,
};
use profmig_identity::{IdentityResolver, MigrationPlanner, PlanOptions, PowerShellDirectory, PowerShellTranslator};
use profmig_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, build_sha};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::orchestrator::BatchOrchestrator;
use crate::pipeline::{PipelineSettings, PipelineStages, ProfilePipeline};

/// External collaborators the batch talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Directory queried for identities.
    pub directory: Arc<dyn DirectoryService>,
    /// Local account translation.
    pub translator: Arc<dyn AccountTranslator>,
    /// Container storage.
    pub storage: Arc<dyn BlockStorage>,
    /// Mirror tool.
    pub mirror: Arc<dyn MirrorTool>,
    /// ACL editing.
    pub acl: Arc<dyn AclEditor>,
    /// Offline registry hives.
    pub hive: Arc<dyn HiveStore>,
}

impl Collaborators {
    /// Production adapters driving PowerShell, robocopy, icacls and reg.
    #[must_use]
    pub fn system() -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner);
        Self {
            directory: Arc::new(PowerShellDirectory::new(Arc::clone(&runner))),
            translator: Arc::new(PowerShellTranslator::new(Arc::clone(&runner))),
            storage: Arc::new(PowerShellBlockStorage::new(Arc::clone(&runner))),
            mirror: Arc::new(RobocopyTool::new(Arc::clone(&runner))),
            acl: Arc::new(IcaclsEditor::new(Arc::clone(&runner))),
            hive: Arc::new(RegHiveStore::new(runner)),
        }
    }
}

/// Dependencies required to run a batch.
pub struct BootstrapDependencies {
    config: MigrationConfig,
    source: Box<dyn ProfileSource>,
    collaborators: Collaborators,
    events: EventBus,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Bundle a configuration, profile source and collaborators with a fresh
    /// event bus and metrics registry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Telemetry`] when the metrics registry cannot be built.
    pub fn new(
        config: MigrationConfig,
        source: Box<dyn ProfileSource>,
        collaborators: Collaborators,
    ) -> AppResult<Self> {
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            source,
            collaborators,
            events: EventBus::new(),
            metrics,
        })
    }

    /// Event bus the batch publishes progress on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Metrics registry the batch records into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Wire the planner and pipeline for `config`.
///
/// # Errors
///
/// Returns an error when denylist or removal patterns do not compile.
pub fn build_orchestrator(
    config: &MigrationConfig,
    collaborators: &Collaborators,
    events: EventBus,
    metrics: Metrics,
) -> AppResult<BatchOrchestrator> {
    let planner = MigrationPlanner::new(
        Arc::clone(&collaborators.translator),
        IdentityResolver::new(Arc::clone(&collaborators.directory)),
        PlanOptions {
            target_root: config.target_root.clone(),
            component_order: config.identity.component_order,
            format: config.disk.format,
            search_roots: config.identity.search_roots.clone(),
        },
    );

    let stages = PipelineStages {
        provisioner: DiskProvisioner::new(
            Arc::clone(&collaborators.storage),
            Arc::clone(&collaborators.acl),
            MountPolicy {
                attempts: config.disk.mount_poll_attempts,
                settle: config.disk.mount_settle(),
            },
        ),
        transfer: TransferEngine::new(Arc::clone(&collaborators.mirror), &config.transfer)
            .map_err(|source| AppError::Transfer {
                operation: "transfer.rules",
                source,
            })?,
        ownership: OwnershipPropagator::new(
            Arc::clone(&collaborators.acl),
            &config.normalize.service_principals,
        ),
        hive: HiveNormalizer::new(Arc::clone(&collaborators.hive), &config.normalize),
        removal: RemovalRules::new(&config.normalize.remove_files).map_err(|source| AppError::Rules {
            operation: "cleanup.rules",
            source,
        })?,
    };
    let pipeline = ProfilePipeline::new(
        stages,
        PipelineSettings::from_config(config),
        events.clone(),
        metrics.clone(),
    );
    Ok(BatchOrchestrator::new(planner, pipeline, events, metrics))
}

/// Entry point for a batch run with production collaborators.
///
/// Installs logging for the lifetime of the run.
///
/// # Errors
///
/// Returns an error if logging, configuration, the profile source or the
/// output files fail. Per-profile failures are reported, not returned.
pub async fn run_app(config: MigrationConfig, source: Box<dyn ProfileSource>) -> AppResult<BatchReport> {
    let logging = LoggingConfig {
        level: &config.logging.level,
        format: if config.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        build_sha: build_sha(),
        log_file: config.logging.log_path.as_deref(),
    };
    let _logging_guard =
        profmig_telemetry::init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let dependencies = BootstrapDependencies::new(config, source, Collaborators::system())?;
    Box::pin(run_app_with(dependencies)).await
}

/// Batch sequence that relies entirely on injected dependencies.
///
/// # Errors
///
/// Same as [`run_app`], minus logging installation.
pub async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<BatchReport> {
    let BootstrapDependencies {
        config,
        source,
        collaborators,
        events,
        metrics,
    } = dependencies;

    config.validate().map_err(|err| AppError::config("config.validate", err))?;
    let orchestrator = build_orchestrator(&config, &collaborators, events, metrics.clone())?;
    let sources = source.profile_paths().map_err(|source| AppError::Source {
        operation: "profile_source.list",
        source,
    })?;

    let run_id = Uuid::new_v4();
    let _context = GlobalContextGuard::new(run_id.to_string());
    info!(profiles = sources.len(), target_root = %config.target_root.display(), "profile migration starting");

    let report = orchestrator.run(run_id, &sources).await;

    if let Some(path) = &config.output.report_path {
        write_report(path, &report)?;
    }
    if let Some(path) = &config.output.metrics_path {
        write_metrics(path, &metrics)?;
    }
    Ok(report)
}

/// Write the batch report as pretty JSON.
///
/// # Errors
///
/// Returns an error when the report cannot be serialised or written.
pub fn write_report(path: &Path, report: &BatchReport) -> AppResult<()> {
    let serialised =
        serde_json::to_string_pretty(report).map_err(|source| AppError::json("report.serialize", path, source))?;
    create_parent(path, "report.create_dir")?;
    fs::write(path, serialised).map_err(|source| AppError::io("report.write", path, source))?;
    info!(path = %path.display(), "batch report written");
    Ok(())
}

/// Write the metrics registry in Prometheus text format.
///
/// # Errors
///
/// Returns an error when the metrics cannot be rendered or written.
pub fn write_metrics(path: &Path, metrics: &Metrics) -> AppResult<()> {
    let rendered = metrics
        .render()
        .map_err(|err| AppError::telemetry("telemetry.render", err))?;
    create_parent(path, "metrics.create_dir")?;
    fs::write(path, rendered).map_err(|source| AppError::io("metrics.write", path, source))
}

fn create_parent(path: &Path, operation: &'static str) -> AppResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| AppError::io(operation, parent, source))
        }
        _ => Ok(()),
    }
}
