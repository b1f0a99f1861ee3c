//! Collaborator ports implemented by production adapters and test fakes.

mod source;

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use async_trait::async_trait;

use crate::error::CollaboratorResult;
use crate::model::{AccountIdentity, BlockSize, MirrorOutput, MirrorRequest, MountPoint, SecurityIdentifier};

pub use source::{DirectoryProfileSource, ProfileSource, StaticProfileSource};

/// Lookup issued against one directory search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryQuery {
    /// Find the account with this logon name.
    AccountName(String),
    /// Find the account with this security identifier.
    Identifier(SecurityIdentifier),
}

impl Display for DirectoryQuery {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountName(name) => write!(formatter, "name={name}"),
            Self::Identifier(sid) => write!(formatter, "sid={sid}"),
        }
    }
}

/// Account found in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Security identifier of the account.
    pub sid: SecurityIdentifier,
    /// Logon name of the account.
    pub account_name: String,
    /// Owning domain, when reported.
    pub domain: Option<String>,
}

/// Directory that answers subtree queries scoped to a search root.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Return zero or one matching entry under `root`.
    async fn find_in_root(
        &self,
        root: &str,
        query: &DirectoryQuery,
    ) -> CollaboratorResult<Option<DirectoryEntry>>;
}

/// Host-local account name translation.
#[async_trait]
pub trait AccountTranslator: Send + Sync {
    /// Translate an account name into its identity, `None` when unknown.
    async fn translate(&self, account_name: &str) -> CollaboratorResult<Option<AccountIdentity>>;
}

/// Virtual-disk storage operations keyed by backing-file path.
#[async_trait]
pub trait BlockStorage: Send + Sync {
    /// Create a dynamically-expanding container.
    async fn create(&self, path: &Path, size_bytes: u64, block_size: BlockSize)
    -> CollaboratorResult<()>;

    /// Attach a freshly created container, create one maximum-size partition and format it.
    /// The container stays attached afterwards.
    async fn initialize(&self, path: &Path, label: &str) -> CollaboratorResult<()>;

    /// Attach an existing container.
    async fn attach(&self, path: &Path) -> CollaboratorResult<()>;

    /// Designators currently reported for the attached container.
    async fn mount_points(&self, path: &Path) -> CollaboratorResult<Vec<MountPoint>>;

    /// Detach the container.
    async fn detach(&self, path: &Path) -> CollaboratorResult<()>;
}

/// Attribute- and ACL-preserving recursive copy tool.
#[async_trait]
pub trait MirrorTool: Send + Sync {
    /// Run one mirror pass.
    async fn mirror(&self, request: &MirrorRequest) -> CollaboratorResult<MirrorOutput>;
}

/// Ownership and access-control editing.
#[async_trait]
pub trait AclEditor: Send + Sync {
    /// Make `principal` the owner of `path`.
    async fn set_owner(&self, path: &Path, principal: &str, recursive: bool) -> CollaboratorResult<()>;

    /// Replace explicit entries on `path` with inherited defaults.
    async fn reset(&self, path: &Path, recursive: bool) -> CollaboratorResult<()>;

    /// Grant `principal` inheritable full control on `path`.
    async fn grant_full_control(
        &self,
        path: &Path,
        principal: &str,
        recursive: bool,
    ) -> CollaboratorResult<()>;
}

/// Offline registry hive operations.
#[async_trait]
pub trait HiveStore: Send + Sync {
    /// Load `hive_file` under `namespace` (for example `HKU\PROFMIG_...`).
    async fn load(&self, namespace: &str, hive_file: &Path) -> CollaboratorResult<()>;

    /// Unload the hive mounted under `namespace`.
    async fn unload(&self, namespace: &str) -> CollaboratorResult<()>;

    /// Whether `key` exists.
    async fn key_exists(&self, key: &str) -> CollaboratorResult<bool>;

    /// Delete `key` and everything below it.
    async fn delete_key(&self, key: &str) -> CollaboratorResult<()>;
}
