//! Default values for migration settings.
//!
//! # Design
//! - Keep denylists and registry subtrees in one place so the copy and the
//!   normalization pass agree on what a profile contains.
//! - Retry and polling windows are explicit constants for auditability.

/// Default container size quota (30 GiB).
pub const DEFAULT_SIZE_BYTES: u64 = 30 * 1024 * 1024 * 1024;
/// Smallest container the storage stack accepts (3 MiB).
pub const MIN_SIZE_BYTES: u64 = 3 * 1024 * 1024;
/// Largest container the storage stack accepts (64 TiB).
pub const MAX_SIZE_BYTES: u64 = 64 * 1024 * 1024 * 1024 * 1024;

/// Default parallel copy workers.
pub const DEFAULT_TRANSFER_THREADS: u16 = 16;
/// Upper bound on parallel copy workers.
pub const MAX_TRANSFER_THREADS: u16 = 128;

/// Directories never copied into a container.
pub const EXCLUDED_DIRECTORIES: &[&str] = &["System Volume Information", "$RECYCLE.BIN", "NetHood"];
/// Files never copied into a container.
pub const EXCLUDED_FILES: &[&str] = &["*.ost", "*autodiscover*.xml"];

/// Per-user registry hive file at the root of a profile.
pub const HIVE_FILE_NAME: &str = "NTUSER.DAT";
/// Prefix of the temporary namespace the hive is loaded under.
pub const HIVE_NAMESPACE_PREFIX: &str = "HKU\\PROFMIG_";
/// Registry subtrees removed from the migrated hive, relative to the hive root.
pub const REGISTRY_SUBTREES: &[&str] = &[
    "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\User Shell Folders",
    "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Shell Folders",
    "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\MountPoints2",
    "Software\\Microsoft\\Office\\16.0\\Outlook\\Profiles",
];
/// Files removed from the copied profile, as globs relative to the profile root.
pub const REMOVED_FILES: &[&str] = &["AppData/Local/Temp/**", "**/Thumbs.db"];

/// Attempts for hive load and unload.
pub const HIVE_RETRY_ATTEMPTS: u32 = 3;
/// Fixed delay between hive attempts.
pub const HIVE_RETRY_DELAY_MS: u64 = 5_000;

/// Principals granted full control next to the profile owner.
pub const SERVICE_PRINCIPALS: &[&str] = &["Administrators", "SYSTEM"];

/// Polls of the mount designators before giving up.
pub const MOUNT_POLL_ATTEMPTS: u32 = 10;
/// Delay between mount designator polls.
pub const MOUNT_SETTLE_MS: u64 = 1_000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub(crate) fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
