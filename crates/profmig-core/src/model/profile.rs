use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::identity::{AccountIdentity, SecurityIdentifier};
use crate::error::ModelError;

/// Marker rendered in place of a target path when a profile cannot be migrated.
pub const UNRESOLVABLE_SENTINEL: &str = "Cannot Copy";

const BACKING_FILE_PREFIX: &str = "Profile_";

/// Image format of the per-user container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskFormat {
    /// Current dynamically-expanding image format.
    #[default]
    Vhdx,
    /// Legacy image format for older hosts.
    Vhd,
}

impl DiskFormat {
    /// File extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Vhdx => "vhdx",
            Self::Vhd => "vhd",
        }
    }
}

/// Order of the identifier and name components in the per-user target folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOrder {
    /// `<SID>_<name>`.
    #[default]
    IdentifierFirst,
    /// `<name>_<SID>`.
    NameFirst,
}

impl ComponentOrder {
    /// Folder name combining the identifier and account name.
    #[must_use]
    pub fn folder_name(self, sid: &SecurityIdentifier, username: &str) -> String {
        match self {
            Self::IdentifierFirst => format!("{sid}_{username}"),
            Self::NameFirst => format!("{username}_{sid}"),
        }
    }
}

impl FromStr for ComponentOrder {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identifier_first" | "sid_first" | "sid" => Ok(Self::IdentifierFirst),
            "name_first" | "name" => Ok(Self::NameFirst),
            _ => Err(ModelError::InvalidValue {
                field: "component_order",
                reason: "unsupported",
                value: value.to_string(),
            }),
        }
    }
}

/// Destination of a profile: a concrete backing-file path or the unresolvable sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum TargetPath {
    /// Backing-file path of the per-user container.
    Resolved(PathBuf),
    /// Identity could not be resolved; the profile must not be migrated.
    Unresolvable,
}

impl TargetPath {
    /// Compose the backing-file path for a resolved identity.
    ///
    /// The result depends only on the inputs, so planning the same profile twice
    /// always yields the same target.
    #[must_use]
    pub fn compose(
        root: &Path,
        order: ComponentOrder,
        sid: &SecurityIdentifier,
        username: &str,
        format: DiskFormat,
    ) -> PathBuf {
        let folder = order.folder_name(sid, username);
        let file = format!(
            "{BACKING_FILE_PREFIX}{username}.{}",
            format.extension()
        );
        root.join(folder).join(file)
    }

    /// Borrow the backing-file path when resolved.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Resolved(path) => Some(path),
            Self::Unresolvable => None,
        }
    }

    /// Whether the target carries the unresolvable sentinel.
    #[must_use]
    pub const fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unresolvable)
    }
}

impl Display for TargetPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(path) => write!(formatter, "{}", path.display()),
            Self::Unresolvable => formatter.write_str(UNRESOLVABLE_SENTINEL),
        }
    }
}

/// Planned migration for a single source profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    source_path: PathBuf,
    username: String,
    display_name: Option<String>,
    identity: Option<AccountIdentity>,
    target: TargetPath,
    format: DiskFormat,
}

impl ProfileRecord {
    /// Build a record whose identity was resolved.
    #[must_use]
    pub fn resolved(
        source_path: PathBuf,
        username: String,
        display_name: Option<String>,
        identity: AccountIdentity,
        target: PathBuf,
        format: DiskFormat,
    ) -> Self {
        Self {
            source_path,
            username,
            display_name,
            identity: Some(identity),
            target: TargetPath::Resolved(target),
            format,
        }
    }

    /// Build a record that carries the unresolvable sentinel.
    #[must_use]
    pub const fn unresolvable(
        source_path: PathBuf,
        username: String,
        display_name: Option<String>,
        format: DiskFormat,
    ) -> Self {
        Self {
            source_path,
            username,
            display_name,
            identity: None,
            target: TargetPath::Unresolvable,
            format,
        }
    }

    /// Source profile folder.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Username derived from the source folder (or the caller override).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Display name resolved from an identifier embedded in the folder name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Resolved identity, absent when unresolvable.
    #[must_use]
    pub const fn identity(&self) -> Option<&AccountIdentity> {
        self.identity.as_ref()
    }

    /// Target backing-file path or sentinel.
    #[must_use]
    pub const fn target(&self) -> &TargetPath {
        &self.target
    }

    /// Container image format.
    #[must_use]
    pub const fn format(&self) -> DiskFormat {
        self.format
    }

    /// Backing-file path and identity when the record can be migrated.
    #[must_use]
    pub fn migration_target(&self) -> Option<(&Path, &AccountIdentity)> {
        match (&self.target, &self.identity) {
            (TargetPath::Resolved(path), Some(identity)) => Some((path.as_path(), identity)),
            _ => None,
        }
    }
}
