//! Ownership and ACL propagation over a copied profile.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use profmig_core::{AccountIdentity, AclEditor, CollaboratorResult, ProcessRunner};
use tracing::{debug, warn};

use crate::error::NormalizeError;

/// ACL editing executable.
pub const ICACLS: &str = "icacls.exe";

/// [`AclEditor`] backed by `icacls`.
pub struct IcaclsEditor {
    runner: Arc<dyn ProcessRunner>,
}

impl IcaclsEditor {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    async fn icacls(
        &self,
        operation: &'static str,
        path: &Path,
        action: &[String],
        recursive: bool,
    ) -> CollaboratorResult<()> {
        let mut args = vec![path.display().to_string()];
        args.extend(action.iter().cloned());
        if recursive {
            args.push("/T".to_string());
        }
        args.push("/C".to_string());
        args.push("/Q".to_string());
        debug!(operation, path = %path.display(), recursive, "running icacls");
        self.runner
            .run(ICACLS, &args)
            .await?
            .require_success(ICACLS, operation)
            .map(drop)
    }
}

#[async_trait]
impl AclEditor for IcaclsEditor {
    async fn set_owner(&self, path: &Path, principal: &str, recursive: bool) -> CollaboratorResult<()> {
        let action = ["/setowner".to_string(), principal.to_string()];
        self.icacls("set owner", path, &action, recursive).await
    }

    async fn reset(&self, path: &Path, recursive: bool) -> CollaboratorResult<()> {
        self.icacls("reset acl", path, &["/reset".to_string()], recursive).await
    }

    async fn grant_full_control(
        &self,
        path: &Path,
        principal: &str,
        recursive: bool,
    ) -> CollaboratorResult<()> {
        let grant = if path.is_file() {
            format!("{principal}:F")
        } else {
            format!("{principal}:(OI)(CI)F")
        };
        let action = ["/grant:r".to_string(), grant];
        self.icacls("grant full control", path, &action, recursive).await
    }
}

/// Re-owns a copied profile and its container directory for the migrated account.
pub struct OwnershipPropagator {
    editor: Arc<dyn AclEditor>,
    service_principals: Vec<String>,
}

impl OwnershipPropagator {
    /// Build a propagator granting `service_principals` alongside the account.
    #[must_use]
    pub fn new(editor: Arc<dyn AclEditor>, service_principals: &[String]) -> Self {
        Self {
            editor,
            service_principals: service_principals.to_vec(),
        }
    }

    /// Apply ownership and grants, returning every step that failed.
    ///
    /// Order: owner on the tree, ACL reset, grants on the tree, then owner and
    /// grants on the directory holding `backing_path`. A failed step does not
    /// stop later ones.
    pub async fn apply(
        &self,
        profile_root: &Path,
        backing_path: &Path,
        identity: &AccountIdentity,
    ) -> Vec<NormalizeError> {
        let principal = identity.principal();
        let mut failures = Vec::new();

        let mut record = |step: &'static str, path: &Path, result: CollaboratorResult<()>| {
            if let Err(source) = result {
                warn!(step, path = %path.display(), error = %source, "ownership step failed");
                failures.push(NormalizeError::Ownership {
                    step,
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        record(
            "set owner",
            profile_root,
            self.editor.set_owner(profile_root, &principal, true).await,
        );
        record("reset acl", profile_root, self.editor.reset(profile_root, true).await);
        for grantee in self.grantees(&principal) {
            record(
                "grant full control",
                profile_root,
                self.editor.grant_full_control(profile_root, grantee, true).await,
            );
        }

        if let Some(container_dir) = backing_path.parent() {
            record(
                "set container owner",
                container_dir,
                self.editor.set_owner(container_dir, &principal, false).await,
            );
            for grantee in self.grantees(&principal) {
                record(
                    "grant container access",
                    container_dir,
                    self.editor.grant_full_control(container_dir, grantee, false).await,
                );
            }
        }

        failures
    }

    fn grantees<'a>(&'a self, principal: &'a str) -> impl Iterator<Item = &'a str> {
        self.service_principals
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(principal))
    }
}
