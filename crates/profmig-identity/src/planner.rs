//! Turns raw profile paths into immutable [`ProfileRecord`]s.
//!
//! # Design
//! - Planning never fails: lookup problems become the unresolvable sentinel,
//!   which is the only gate later stages consult.
//! - The target path is a pure function of the configured root, component
//!   order, format, resolved identifier and username.
//! - The host-local translator is asked first; the directory resolver is the
//!   fallback for accounts the host cannot translate.
//! - A folder named only by its identifier takes the resolved display name as
//!   its username.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use profmig_core::{
    AccountIdentity, AccountTranslator, ComponentOrder, DiskFormat, ProfileRecord, TargetPath,
};
use tracing::{debug, info, warn};

use crate::naming::parse_folder_name;
use crate::resolver::IdentityResolver;

/// Display name recorded when an embedded identifier cannot be resolved.
pub const DISPLAY_NAME_NOT_FOUND: &str = "Not Found";

/// Inputs shared by every planned record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Directory under which per-user target folders are created.
    pub target_root: PathBuf,
    /// Order of identifier and name in the target folder.
    pub component_order: ComponentOrder,
    /// Container image format.
    pub format: DiskFormat,
    /// Directory search roots, in priority order.
    pub search_roots: Vec<String>,
}

/// Builds profile records for a batch.
pub struct MigrationPlanner {
    translator: Arc<dyn AccountTranslator>,
    resolver: IdentityResolver,
    options: PlanOptions,
}

impl MigrationPlanner {
    /// Construct a planner.
    #[must_use]
    pub fn new(
        translator: Arc<dyn AccountTranslator>,
        resolver: IdentityResolver,
        options: PlanOptions,
    ) -> Self {
        Self {
            translator,
            resolver,
            options,
        }
    }

    /// Plan one profile using the username derived from its folder name.
    ///
    /// Returns `None` for an empty or malformed source path, and for an
    /// identifier-only folder whose identifier cannot be resolved to a name.
    pub async fn plan(&self, source: &Path) -> Option<ProfileRecord> {
        self.plan_as(source, None).await
    }

    /// Plan one profile, optionally replacing the derived username.
    pub async fn plan_as(&self, source: &Path, username_override: Option<&str>) -> Option<ProfileRecord> {
        let Some(folder) = parse_folder_name(source) else {
            warn!(source = %source.display(), "profile path has no usable folder name");
            return None;
        };
        let display_name = match &folder.embedded_sid {
            Some(sid) => Some(
                match self
                    .resolver
                    .resolve_name_for_identifier(sid, &self.options.search_roots)
                    .await
                {
                    Ok(Some(identity)) => identity.account_name,
                    Ok(None) => DISPLAY_NAME_NOT_FOUND.to_string(),
                    Err(error) => {
                        warn!(%sid, error = %error, "embedded identifier lookup failed");
                        DISPLAY_NAME_NOT_FOUND.to_string()
                    }
                },
            ),
            None => None,
        };

        let resolved_name = display_name
            .as_deref()
            .filter(|name| *name != DISPLAY_NAME_NOT_FOUND);
        let username = username_override
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or(folder.username.as_deref())
            .or(resolved_name)
            .map(str::to_string);
        let Some(username) = username else {
            warn!(source = %source.display(), "identifier-only folder has no resolvable name");
            return None;
        };

        let record = match self.resolve_identity(&username).await {
            Some(identity) => {
                let target = TargetPath::compose(
                    &self.options.target_root,
                    self.options.component_order,
                    &identity.sid,
                    &username,
                    self.options.format,
                );
                ProfileRecord::resolved(
                    source.to_path_buf(),
                    username,
                    display_name,
                    identity,
                    target,
                    self.options.format,
                )
            }
            None => ProfileRecord::unresolvable(
                source.to_path_buf(),
                username,
                display_name,
                self.options.format,
            ),
        };

        info!(
            source = %record.source_path().display(),
            user = record.username(),
            target = %record.target(),
            "planned profile"
        );
        Some(record)
    }

    /// Plan every path, preserving input order and dropping malformed paths.
    pub async fn plan_all(&self, sources: &[PathBuf]) -> Vec<ProfileRecord> {
        let mut records = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(record) = self.plan(source).await {
                records.push(record);
            }
        }
        records
    }

    async fn resolve_identity(&self, username: &str) -> Option<AccountIdentity> {
        match self.translator.translate(username).await {
            Ok(Some(identity)) => return Some(identity),
            Ok(None) => debug!(user = username, "host could not translate account"),
            Err(error) => warn!(user = username, error = %error, "account translation failed"),
        }

        match self
            .resolver
            .resolve_account_for_name(username, &self.options.search_roots)
            .await
        {
            Ok(found) => found,
            Err(error) => {
                warn!(user = username, error = %error, "directory fallback unavailable");
                None
            }
        }
    }
}
