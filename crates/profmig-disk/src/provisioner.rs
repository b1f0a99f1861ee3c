//! Create-or-attach provisioning for per-user containers.
//!
//! # Design
//! - Existing storage is only ever attached, never re-initialized.
//! - A backing file created by this call is discarded again (detach, then
//!   remove) if anything fails before a handle is returned. Pre-existing
//!   storage is never removed.
//! - The attachment registry allows at most one live handle per backing path.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use profmig_core::{AclEditor, BlockSize, BlockStorage, ProfileRecord, VolumeHandle};
use tracing::{error, info, warn};

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::mount::{MountPolicy, resolve_mount};

const LABEL_PREFIX: &str = "Profile-";
const MAX_LABEL_CHARS: usize = 32;
const BACKING_EXTENSIONS: [&str; 2] = ["vhdx", "vhd"];

/// Provisions, attaches and releases per-user containers.
pub struct DiskProvisioner {
    storage: Arc<dyn BlockStorage>,
    acl: Arc<dyn AclEditor>,
    mount_policy: MountPolicy,
    attached: Mutex<HashSet<PathBuf>>,
}

impl DiskProvisioner {
    /// Construct a provisioner over the storage and ACL collaborators.
    #[must_use]
    pub fn new(
        storage: Arc<dyn BlockStorage>,
        acl: Arc<dyn AclEditor>,
        mount_policy: MountPolicy,
    ) -> Self {
        Self {
            storage,
            acl,
            mount_policy,
            attached: Mutex::new(HashSet::new()),
        }
    }

    /// Attach the record's existing container, or create, initialize and attach a new one.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Unresolvable`] for sentinel records,
    /// [`ProvisioningError::AlreadyAttached`] while another handle for the same
    /// backing file is live, and storage, mount or ownership failures otherwise.
    pub async fn provision_or_attach(
        &self,
        record: &ProfileRecord,
        size_bytes: u64,
        block_size: BlockSize,
    ) -> ProvisioningResult<VolumeHandle> {
        let Some((target, identity)) = record.migration_target() else {
            return Err(ProvisioningError::Unresolvable {
                source_path: record.source_path().to_path_buf(),
            });
        };

        let existing = find_existing_backing(target)?;
        let backing = existing.clone().unwrap_or_else(|| target.to_path_buf());
        self.claim(&backing)?;

        let principal = identity.principal();
        let result = self
            .acquire(
                &backing,
                existing.is_none(),
                record.username(),
                &principal,
                size_bytes,
                block_size,
            )
            .await;
        if result.is_err() {
            self.unclaim(&backing);
        }
        result
    }

    /// Detach the container behind `handle` and drop it from the registry.
    ///
    /// The registry entry is cleared even when the detach fails.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Storage`] when the detach fails.
    pub async fn release(&self, handle: VolumeHandle) -> ProvisioningResult<()> {
        let backing = handle.backing_path();
        let result = self
            .storage
            .detach(backing)
            .await
            .map_err(|source| ProvisioningError::storage("detach", backing, source));
        self.unclaim(backing);
        if result.is_ok() {
            info!(backing = %backing.display(), "container detached");
        }
        result
    }

    /// Whether a handle for `backing_path` is currently live.
    #[must_use]
    pub fn is_attached(&self, backing_path: &Path) -> bool {
        self.lock_registry().contains(backing_path)
    }

    async fn acquire(
        &self,
        backing: &Path,
        create: bool,
        username: &str,
        principal: &str,
        size_bytes: u64,
        block_size: BlockSize,
    ) -> ProvisioningResult<VolumeHandle> {
        if create {
            self.create_container(backing, username, size_bytes, block_size)
                .await?;
        } else {
            self.storage
                .attach(backing)
                .await
                .map_err(|source| ProvisioningError::storage("attach", backing, source))?;
            info!(backing = %backing.display(), "attached existing container");
        }

        let mount = match resolve_mount(self.storage.as_ref(), backing, self.mount_policy).await {
            Ok(mount) => mount,
            Err(err) => {
                self.abandon(backing, create).await;
                return Err(err);
            }
        };

        if let Err(source) = self
            .acl
            .grant_full_control(backing, principal, false)
            .await
        {
            self.abandon(backing, create).await;
            return Err(ProvisioningError::Ownership {
                path: backing.to_path_buf(),
                principal: principal.to_string(),
                source,
            });
        }

        info!(
            backing = %backing.display(),
            mount = %mount,
            fresh = create,
            "container ready"
        );
        Ok(VolumeHandle::new(
            backing.to_path_buf(),
            mount,
            size_bytes,
            block_size,
            create,
        ))
    }

    async fn create_container(
        &self,
        backing: &Path,
        username: &str,
        size_bytes: u64,
        block_size: BlockSize,
    ) -> ProvisioningResult<()> {
        if let Some(parent) = backing.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ProvisioningError::io("create target directory", parent, err))?;
        }

        if let Err(source) = self.storage.create(backing, size_bytes, block_size).await {
            self.abandon(backing, true).await;
            return Err(ProvisioningError::storage("create", backing, source));
        }

        let label = volume_label(username);
        if let Err(source) = self.storage.initialize(backing, &label).await {
            self.abandon(backing, true).await;
            return Err(ProvisioningError::storage("initialize", backing, source));
        }
        info!(backing = %backing.display(), label = %label, size_bytes, %block_size, "created container");
        Ok(())
    }

    /// Best-effort rollback after a failed acquisition.
    async fn abandon(&self, backing: &Path, remove: bool) {
        if let Err(err) = self.storage.detach(backing).await {
            warn!(backing = %backing.display(), error = %err, "detach after failure did not complete");
        }
        if !remove {
            return;
        }
        match tokio::fs::remove_file(backing).await {
            Ok(()) => warn!(backing = %backing.display(), "removed partially provisioned container"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(backing = %backing.display(), error = %err, "failed to remove partially provisioned container");
            }
        }
    }

    fn claim(&self, backing: &Path) -> ProvisioningResult<()> {
        let mut registry = self.lock_registry();
        if registry.insert(backing.to_path_buf()) {
            Ok(())
        } else {
            Err(ProvisioningError::AlreadyAttached {
                path: backing.to_path_buf(),
            })
        }
    }

    fn unclaim(&self, backing: &Path) {
        self.lock_registry().remove(backing);
    }

    fn lock_registry(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        match self.attached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("attachment registry mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

/// Volume label for a user's container, truncated to the filesystem limit.
#[must_use]
pub fn volume_label(username: &str) -> String {
    format!("{LABEL_PREFIX}{username}")
        .chars()
        .take(MAX_LABEL_CHARS)
        .collect()
}

/// Locate an existing backing file for `target`, tolerating either image extension.
///
/// The exact target wins; otherwise the first file (by name) whose name starts
/// with the target stem followed by `.` and carries a container extension.
///
/// # Errors
///
/// Returns [`ProvisioningError::Io`] when the target directory exists but cannot be read.
pub fn find_existing_backing(target: &Path) -> ProvisioningResult<Option<PathBuf>> {
    if target.is_file() {
        return Ok(Some(target.to_path_buf()));
    }
    let (Some(directory), Some(stem)) = (target.parent(), target.file_stem()) else {
        return Ok(None);
    };
    let prefix = format!("{}.", stem.to_string_lossy()).to_ascii_lowercase();

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ProvisioningError::io("scan target directory", directory, err)),
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ProvisioningError::io("scan target directory", directory, err))?;
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        let is_container = BACKING_EXTENSIONS
            .iter()
            .any(|extension| name.strip_prefix(&prefix) == Some(*extension));
        if is_container && entry.path().is_file() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use profmig_core::{DiskFormat, TargetPath};
    use profmig_test_support::fixtures::account;
    use profmig_test_support::mocks::{AclCall, FakeBlockStorage, RecordingAclEditor, StorageCall};

    type TestResult<T> = anyhow::Result<T>;

    const POLICY: MountPolicy = MountPolicy {
        attempts: 3,
        settle: Duration::ZERO,
    };
    const SIZE: u64 = 30 * 1024 * 1024 * 1024;

    fn record(root: &Path, format: DiskFormat) -> ProfileRecord {
        let identity = account("S-1-5-21-1-2-3-1001", "jdoe", Some("CORP"));
        let target = TargetPath::compose(
            root,
            profmig_core::ComponentOrder::IdentifierFirst,
            &identity.sid,
            "jdoe",
            format,
        );
        ProfileRecord::resolved(
            PathBuf::from("/profiles/jdoe.V6"),
            "jdoe".into(),
            None,
            identity,
            target,
            format,
        )
    }

    struct Harness {
        _temp: tempfile::TempDir,
        root: PathBuf,
        storage: Arc<FakeBlockStorage>,
        acl: Arc<RecordingAclEditor>,
        provisioner: DiskProvisioner,
    }

    fn harness(storage: impl FnOnce(PathBuf) -> FakeBlockStorage, acl: RecordingAclEditor) -> TestResult<Harness> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("targets");
        let storage = Arc::new(storage(temp.path().join("mnt")));
        let acl = Arc::new(acl);
        let provisioner = DiskProvisioner::new(storage.clone(), acl.clone(), POLICY);
        Ok(Harness {
            _temp: temp,
            root,
            storage,
            acl,
            provisioner,
        })
    }

    #[tokio::test]
    async fn fresh_target_is_created_initialized_and_owned() -> TestResult<()> {
        let h = harness(FakeBlockStorage::new, RecordingAclEditor::new())?;
        let record = record(&h.root, DiskFormat::Vhdx);

        let handle = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await?;

        assert!(handle.freshly_created());
        assert!(h.provisioner.is_attached(handle.backing_path()));
        assert_eq!(h.storage.initialize_count(), 1);
        assert!(h.storage.calls().contains(&StorageCall::Initialize {
            path: handle.backing_path().to_path_buf(),
            label: "Profile-jdoe".into(),
        }));
        assert_eq!(
            h.acl.calls(),
            vec![AclCall::Grant {
                path: handle.backing_path().to_path_buf(),
                principal: "CORP\\jdoe".into(),
                recursive: false,
            }]
        );

        h.provisioner.release(handle).await?;
        Ok(())
    }

    #[tokio::test]
    async fn existing_storage_is_attached_without_reinitialization() -> TestResult<()> {
        let h = harness(FakeBlockStorage::new, RecordingAclEditor::new())?;
        let vhd = record(&h.root, DiskFormat::Vhd);
        let existing = vhd
            .target()
            .as_path()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        fs::create_dir_all(existing.parent().unwrap_or(h.root.as_path()))?;
        fs::write(&existing, b"legacy container")?;

        let handle = h
            .provisioner
            .provision_or_attach(&record(&h.root, DiskFormat::Vhdx), SIZE, BlockSize::FourK)
            .await?;

        assert!(!handle.freshly_created());
        assert_eq!(handle.backing_path(), existing.as_path());
        assert_eq!(h.storage.initialize_count(), 0);
        assert_eq!(fs::read(&existing)?, b"legacy container");

        let backing = handle.backing_path().to_path_buf();
        h.provisioner.release(handle).await?;
        assert!(!h.provisioner.is_attached(&backing));
        assert!(!h.storage.is_attached(&backing));
        Ok(())
    }

    #[tokio::test]
    async fn failed_initialization_removes_the_new_backing_file() -> TestResult<()> {
        let h = harness(|mnt| FakeBlockStorage::new(mnt).failing_initialize(), RecordingAclEditor::new())?;
        let record = record(&h.root, DiskFormat::Vhdx);
        let target = record.target().as_path().map(Path::to_path_buf).unwrap_or_default();

        let result = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::Storage { operation: "initialize", .. })
        ));
        assert!(!target.exists());
        assert!(!h.provisioner.is_attached(&target));
        assert!(h.storage.calls().contains(&StorageCall::Detach(target)));
        Ok(())
    }

    #[tokio::test]
    async fn failed_attach_of_existing_storage_keeps_the_file() -> TestResult<()> {
        let h = harness(|mnt| FakeBlockStorage::new(mnt).failing_attach(), RecordingAclEditor::new())?;
        let record = record(&h.root, DiskFormat::Vhdx);
        let target = record.target().as_path().map(Path::to_path_buf).unwrap_or_default();
        fs::create_dir_all(target.parent().unwrap_or(h.root.as_path()))?;
        fs::write(&target, b"container")?;

        let result = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::Storage { operation: "attach", .. })
        ));
        assert!(target.exists());
        Ok(())
    }

    #[tokio::test]
    async fn ownership_failure_is_reported_and_rolled_back() -> TestResult<()> {
        let h = harness(FakeBlockStorage::new, RecordingAclEditor::new().failing())?;
        let record = record(&h.root, DiskFormat::Vhdx);

        let result = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::Legacy512).await;

        assert!(matches!(result, Err(ProvisioningError::Ownership { .. })));
        let target = record.target().as_path().map(Path::to_path_buf).unwrap_or_default();
        assert!(!target.exists());
        Ok(())
    }

    #[tokio::test]
    async fn second_handle_for_the_same_backing_is_refused() -> TestResult<()> {
        let h = harness(FakeBlockStorage::new, RecordingAclEditor::new())?;
        let record = record(&h.root, DiskFormat::Vhdx);

        let first = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await?;
        let second = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await;

        assert!(matches!(second, Err(ProvisioningError::AlreadyAttached { .. })));
        h.provisioner.release(first).await?;
        Ok(())
    }

    #[tokio::test]
    async fn unresolvable_record_is_rejected() -> TestResult<()> {
        let h = harness(FakeBlockStorage::new, RecordingAclEditor::new())?;
        let record = ProfileRecord::unresolvable(
            PathBuf::from("/profiles/ghost"),
            "ghost".into(),
            None,
            DiskFormat::Vhdx,
        );

        let result = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await;

        assert!(matches!(result, Err(ProvisioningError::Unresolvable { .. })));
        assert!(h.storage.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn release_clears_registry_even_when_detach_fails() -> TestResult<()> {
        let h = harness(|mnt| FakeBlockStorage::new(mnt).failing_detach(), RecordingAclEditor::new())?;
        let record = record(&h.root, DiskFormat::Vhdx);
        let handle = h.provisioner.provision_or_attach(&record, SIZE, BlockSize::FourK).await?;
        let backing = handle.backing_path().to_path_buf();

        assert!(h.provisioner.release(handle).await.is_err());
        assert!(!h.provisioner.is_attached(&backing));
        Ok(())
    }

    #[test]
    fn labels_are_truncated_to_the_filesystem_limit() {
        assert_eq!(volume_label("jdoe"), "Profile-jdoe");
        assert_eq!(volume_label(&"x".repeat(40)).chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn existing_backing_matches_either_extension_only() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let target = temp.path().join("Profile_jdoe.vhdx");
        assert_eq!(find_existing_backing(&target)?, None);

        fs::write(temp.path().join("Profile_jdoe.vhdx.bak"), b"x")?;
        fs::write(temp.path().join("Profile_jdoe2.vhd"), b"x")?;
        assert_eq!(find_existing_backing(&target)?, None);

        fs::write(temp.path().join("Profile_jdoe.VHD"), b"x")?;
        assert_eq!(
            find_existing_backing(&target)?,
            Some(temp.path().join("Profile_jdoe.VHD"))
        );
        Ok(())
    }
}
