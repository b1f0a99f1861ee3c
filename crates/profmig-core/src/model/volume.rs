use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Folder inside the mounted volume that holds the copied profile.
const PROFILE_DIR_NAME: &str = "Profile";

/// Logical sector size of a new container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSize {
    /// 4096-byte sectors.
    #[default]
    #[serde(rename = "4K")]
    FourK,
    /// 512-byte sectors for legacy hosts.
    #[serde(rename = "512")]
    Legacy512,
}

impl BlockSize {
    /// Sector size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::FourK => 4096,
            Self::Legacy512 => 512,
        }
    }
}

impl Display for BlockSize {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::FourK => formatter.write_str("4K"),
            Self::Legacy512 => formatter.write_str("512"),
        }
    }
}

impl FromStr for BlockSize {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "4K" | "4096" => Ok(Self::FourK),
            "512" => Ok(Self::Legacy512),
            _ => Err(ModelError::InvalidValue {
                field: "block_size",
                reason: "expected 4K or 512",
                value: value.to_string(),
            }),
        }
    }
}

/// Designator under which an attached volume is reachable (a drive letter such as `F:`, or a path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MountPoint(String);

impl MountPoint {
    /// Wrap a designator reported by block storage.
    #[must_use]
    pub fn new(designator: impl Into<String>) -> Self {
        Self(designator.into())
    }

    /// Raw designator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem root of the volume.
    ///
    /// Bare drive letters (`F` or `F:`) map to `F:\`; anything else is treated as a path.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        let trimmed = self.0.trim();
        let letter = trimmed.strip_suffix(':').unwrap_or(trimmed);
        let mut chars = letter.chars();
        match (chars.next(), chars.next()) {
            (Some(drive), None) if drive.is_ascii_alphabetic() => {
                PathBuf::from(format!("{}:\\", drive.to_ascii_uppercase()))
            }
            _ => PathBuf::from(trimmed),
        }
    }
}

impl Display for MountPoint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Attached per-user container. Valid between a successful attach and the matching detach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHandle {
    backing_path: PathBuf,
    mount_point: MountPoint,
    size_bytes: u64,
    block_size: BlockSize,
    freshly_created: bool,
}

impl VolumeHandle {
    /// Describe an attached volume.
    #[must_use]
    pub const fn new(
        backing_path: PathBuf,
        mount_point: MountPoint,
        size_bytes: u64,
        block_size: BlockSize,
        freshly_created: bool,
    ) -> Self {
        Self {
            backing_path,
            mount_point,
            size_bytes,
            block_size,
            freshly_created,
        }
    }

    /// Backing file of the container.
    #[must_use]
    pub fn backing_path(&self) -> &Path {
        &self.backing_path
    }

    /// Designator the volume is mounted under.
    #[must_use]
    pub const fn mount_point(&self) -> &MountPoint {
        &self.mount_point
    }

    /// Size quota in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Logical sector size.
    #[must_use]
    pub const fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Whether the container was created by this run rather than reused.
    #[must_use]
    pub const fn freshly_created(&self) -> bool {
        self.freshly_created
    }

    /// Destination directory for the copied profile (`<mount>\Profile`).
    #[must_use]
    pub fn profile_root(&self) -> PathBuf {
        self.mount_point.root().join(PROFILE_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_parses_supported_values() {
        assert_eq!("4k".parse::<BlockSize>(), Ok(BlockSize::FourK));
        assert_eq!("512".parse::<BlockSize>(), Ok(BlockSize::Legacy512));
        assert_eq!(BlockSize::Legacy512.bytes(), 512);
        assert!("1024".parse::<BlockSize>().is_err());
    }

    #[test]
    fn mount_point_root_handles_drive_letters_and_paths() {
        assert_eq!(MountPoint::new("f").root(), PathBuf::from("F:\\"));
        assert_eq!(MountPoint::new("G:").root(), PathBuf::from("G:\\"));
        assert_eq!(
            MountPoint::new("/mnt/profile").root(),
            PathBuf::from("/mnt/profile")
        );
    }

    #[test]
    fn profile_root_nests_under_mount() {
        let handle = VolumeHandle::new(
            PathBuf::from("/targets/Profile_jdoe.vhdx"),
            MountPoint::new("/mnt/jdoe"),
            30 * 1024 * 1024 * 1024,
            BlockSize::FourK,
            true,
        );
        assert_eq!(handle.profile_root(), PathBuf::from("/mnt/jdoe/Profile"));
    }
}
