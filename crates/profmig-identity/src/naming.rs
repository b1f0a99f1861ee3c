//! Username derivation from roaming-profile folder names.
//!
//! Folder names look like `jdoe`, `jdoe.V6`, `jdoe_S-1-5-21-...` or
//! `S-1-5-21-....jdoe.V2`. The version suffix and the embedded identifier are
//! stripped; whatever remains is the username. A folder named only by its
//! identifier (`S-1-5-21-....V6`) has no username of its own.

use std::path::Path;

use once_cell::sync::Lazy;
use profmig_core::SecurityIdentifier;
use regex::Regex;

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.V\d+$").expect("version suffix pattern to compile"));

static EMBEDDED_SID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S-1-\d+(?:-\d+)+").expect("embedded sid pattern to compile"));

const SEPARATORS: [char; 2] = ['/', '\\'];
const JOINERS: [char; 2] = ['_', '.'];

/// Parsed trailing segment of a profile path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderName {
    /// Username with version suffix and identifier removed; `None` for identifier-only folders.
    pub username: Option<String>,
    /// Identifier embedded in the folder name, when present and well formed.
    pub embedded_sid: Option<SecurityIdentifier>,
}

/// Parse the trailing segment of `source`.
///
/// Both `/` and `\` separate segments so UNC paths parse the same way on
/// every host. Returns `None` when there is no trailing segment, or when
/// nothing is left once the suffix is stripped and no identifier was found.
#[must_use]
pub fn parse_folder_name(source: &Path) -> Option<FolderName> {
    let raw = source.to_string_lossy();
    let segment = raw
        .trim_end_matches(SEPARATORS)
        .rsplit(SEPARATORS)
        .next()?
        .trim();
    if segment.is_empty() {
        return None;
    }

    let without_version = VERSION_SUFFIX.replace(segment, "");
    let (remainder, embedded_sid) = match EMBEDDED_SID.find(&without_version) {
        Some(found) => {
            let sid = SecurityIdentifier::parse(found.as_str()).ok();
            let remainder = format!(
                "{}{}",
                without_version[..found.start()].trim_end_matches(JOINERS),
                without_version[found.end()..].trim_start_matches(JOINERS)
            );
            (remainder, sid)
        }
        None => (without_version.into_owned(), None),
    };

    let username = Some(remainder.trim_matches(JOINERS).trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    if username.is_none() && embedded_sid.is_none() {
        return None;
    }
    Some(FolderName {
        username,
        embedded_sid,
    })
}
