//! Identity fixtures and on-disk profile trees.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use profmig_core::{AccountIdentity, SecurityIdentifier};

/// Parse a security identifier, panicking on malformed fixture input.
pub fn sid(value: &str) -> SecurityIdentifier {
    SecurityIdentifier::parse(value).unwrap_or_else(|err| panic!("fixture sid '{value}': {err}"))
}

/// Build an account identity for fixtures.
pub fn account(sid_value: &str, name: &str, domain: Option<&str>) -> AccountIdentity {
    AccountIdentity {
        sid: sid(sid_value),
        account_name: name.to_string(),
        domain: domain.map(str::to_string),
    }
}

/// Write a profile folder under `root` containing `files` (relative path, contents).
///
/// # Errors
///
/// Returns an error when the folder or any file cannot be written.
pub fn write_profile(root: &Path, folder: &str, files: &[(&str, &str)]) -> io::Result<PathBuf> {
    let profile = root.join(folder);
    fs::create_dir_all(&profile)?;
    for (relative, contents) in files {
        let path = profile.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(profile)
}

/// Typical roaming profile contents: a hive, documents, a cache file and an excluded mailbox.
pub const STANDARD_PROFILE: &[(&str, &str)] = &[
    ("NTUSER.DAT", "hive"),
    ("Documents/report.txt", "quarterly numbers"),
    ("Desktop/notes.txt", "remember"),
    ("AppData/Local/Temp/cache.tmp", "scratch"),
    ("AppData/Local/Microsoft/Outlook/mail.ost", "mailbox"),
];
