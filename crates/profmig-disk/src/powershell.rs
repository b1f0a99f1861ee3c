//! Hyper-V storage cmdlets driven through PowerShell.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use profmig_core::process::{POWERSHELL, powershell_args, ps_quote};
use profmig_core::{BlockSize, BlockStorage, CollaboratorResult, MountPoint, ProcessRunner};
use tracing::debug;

/// Block storage adapter over `New-VHD`, `Mount-VHD` and `Dismount-VHD`.
pub struct PowerShellBlockStorage {
    runner: Arc<dyn ProcessRunner>,
}

impl PowerShellBlockStorage {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    async fn script(&self, operation: &'static str, script: &str) -> CollaboratorResult<Vec<String>> {
        debug!(operation, "running storage cmdlet");
        let output = self
            .runner
            .run(POWERSHELL, &powershell_args(script))
            .await?
            .require_success(POWERSHELL, operation)?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

fn quoted(path: &Path) -> String {
    ps_quote(&path.display().to_string())
}

#[async_trait]
impl BlockStorage for PowerShellBlockStorage {
    async fn create(
        &self,
        path: &Path,
        size_bytes: u64,
        block_size: BlockSize,
    ) -> CollaboratorResult<()> {
        let script = format!(
            "New-VHD -Path {path} -SizeBytes {size_bytes} -Dynamic -LogicalSectorSizeBytes {sector} | Out-Null",
            path = quoted(path),
            sector = block_size.bytes(),
        );
        self.script("create container", &script).await.map(drop)
    }

    async fn initialize(&self, path: &Path, label: &str) -> CollaboratorResult<()> {
        let script = format!(
            "$disk = Mount-VHD -Path {path} -Passthru | Get-Disk; \
             Initialize-Disk -Number $disk.Number -PartitionStyle GPT -PassThru | \
             New-Partition -UseMaximumSize -AssignDriveLetter | \
             Format-Volume -FileSystem NTFS -NewFileSystemLabel {label} -Confirm:$false -Force | Out-Null",
            path = quoted(path),
            label = ps_quote(label),
        );
        self.script("initialize container", &script).await.map(drop)
    }

    async fn attach(&self, path: &Path) -> CollaboratorResult<()> {
        let script = format!("Mount-VHD -Path {} | Out-Null", quoted(path));
        self.script("attach container", &script).await.map(drop)
    }

    async fn mount_points(&self, path: &Path) -> CollaboratorResult<Vec<MountPoint>> {
        let script = format!(
            "Get-VHD -Path {} | Get-Disk | Get-Partition | \
             Where-Object {{ $_.DriveLetter -and $_.DriveLetter -ne [char]0 }} | \
             ForEach-Object {{ \"$($_.DriveLetter):\" }}",
            quoted(path)
        );
        let lines = self.script("enumerate mounts", &script).await?;
        Ok(lines.into_iter().map(MountPoint::new).collect())
    }

    async fn detach(&self, path: &Path) -> CollaboratorResult<()> {
        let script = format!("Dismount-VHD -Path {}", quoted(path));
        self.script("detach container", &script).await.map(drop)
    }
}
