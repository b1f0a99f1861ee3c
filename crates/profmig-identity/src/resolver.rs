//! Directory lookups across an ordered list of search roots.
//!
//! # Design
//! - Roots are queried in the order given; the first positive match wins and
//!   later roots are not consulted.
//! - A root that errors is logged and treated as "not found in this root" so a
//!   single unreachable domain controller does not hide accounts elsewhere.

use std::sync::Arc;

use profmig_core::{
    AccountIdentity, DirectoryEntry, DirectoryQuery, DirectoryService, SecurityIdentifier,
};
use tracing::{debug, warn};

use crate::error::{IdentityError, IdentityResult};

/// Resolves identifiers and names against a directory service.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn DirectoryService>,
}

impl IdentityResolver {
    /// Build a resolver over the given directory.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// Find the security identifier of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Configuration`] when `roots` is empty or `name` is blank.
    pub async fn resolve_identifier_for_name(
        &self,
        name: &str,
        roots: &[String],
    ) -> IdentityResult<Option<SecurityIdentifier>> {
        Ok(self
            .resolve_account_for_name(name, roots)
            .await?
            .map(|identity| identity.sid))
    }

    /// Find the full account for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Configuration`] when `roots` is empty or `name` is blank.
    pub async fn resolve_account_for_name(
        &self,
        name: &str,
        roots: &[String],
    ) -> IdentityResult<Option<AccountIdentity>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::Configuration {
                field: "name",
                reason: "must not be empty",
            });
        }
        let entry = self
            .search(&DirectoryQuery::AccountName(name.to_string()), roots)
            .await?;
        Ok(entry.map(into_identity))
    }

    /// Find the account name (and domain) that owns `sid`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Configuration`] when `roots` is empty.
    pub async fn resolve_name_for_identifier(
        &self,
        sid: &SecurityIdentifier,
        roots: &[String],
    ) -> IdentityResult<Option<AccountIdentity>> {
        let entry = self
            .search(&DirectoryQuery::Identifier(sid.clone()), roots)
            .await?;
        Ok(entry.map(into_identity))
    }

    async fn search(
        &self,
        query: &DirectoryQuery,
        roots: &[String],
    ) -> IdentityResult<Option<DirectoryEntry>> {
        let usable: Vec<&str> = roots
            .iter()
            .map(|root| root.trim())
            .filter(|root| !root.is_empty())
            .collect();
        if usable.is_empty() {
            return Err(IdentityError::Configuration {
                field: "search_roots",
                reason: "at least one search root is required",
            });
        }

        for root in usable {
            match self.directory.find_in_root(root, query).await {
                Ok(Some(entry)) => {
                    debug!(%query, root, sid = %entry.sid, "directory match");
                    return Ok(Some(entry));
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(%query, root, error = %error, "directory search root failed");
                }
            }
        }
        debug!(%query, "no directory match in any search root");
        Ok(None)
    }
}

fn into_identity(entry: DirectoryEntry) -> AccountIdentity {
    AccountIdentity {
        sid: entry.sid,
        account_name: entry.account_name,
        domain: entry.domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profmig_test_support::fixtures::{account, sid};
    use profmig_test_support::mocks::FakeDirectory;

    type TestResult<T> = anyhow::Result<T>;

    fn roots(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[tokio::test]
    async fn first_root_with_a_match_wins() -> TestResult<()> {
        let directory = Arc::new(
            FakeDirectory::new()
                .with_account("OU=Staff,DC=corp", &account("S-1-5-21-1-2-3-1001", "jdoe", Some("CORP")))
                .with_account("OU=Legacy,DC=corp", &account("S-1-5-21-9-9-9-2002", "jdoe", Some("OLD"))),
        );
        let resolver = IdentityResolver::new(directory.clone());

        let found = resolver
            .resolve_identifier_for_name("jdoe", &roots(&["OU=Empty,DC=corp", "OU=Staff,DC=corp", "OU=Legacy,DC=corp"]))
            .await?;

        assert_eq!(found, Some(sid("S-1-5-21-1-2-3-1001")));
        assert_eq!(directory.queries().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn failing_root_is_treated_as_no_match() -> TestResult<()> {
        let directory = Arc::new(
            FakeDirectory::new()
                .with_failing_root("DC=down")
                .with_account("DC=up", &account("S-1-5-21-1-2-3-1001", "jdoe", None)),
        );
        let resolver = IdentityResolver::new(directory);

        let found = resolver
            .resolve_name_for_identifier(&sid("S-1-5-21-1-2-3-1001"), &roots(&["DC=down", "DC=up"]))
            .await?;

        assert_eq!(found.map(|identity| identity.account_name), Some("jdoe".into()));
        Ok(())
    }

    #[tokio::test]
    async fn missing_account_is_not_an_error() -> TestResult<()> {
        let resolver = IdentityResolver::new(Arc::new(FakeDirectory::new()));
        let found = resolver
            .resolve_identifier_for_name("ghost", &roots(&["DC=corp"]))
            .await?;
        assert_eq!(found, None);
        Ok(())
    }

    #[tokio::test]
    async fn empty_roots_or_name_are_configuration_errors() {
        let resolver = IdentityResolver::new(Arc::new(FakeDirectory::new()));

        let no_roots = resolver.resolve_identifier_for_name("jdoe", &[]).await;
        assert!(matches!(
            no_roots,
            Err(IdentityError::Configuration { field: "search_roots", .. })
        ));

        let blank_roots = resolver
            .resolve_name_for_identifier(&sid("S-1-5-21-1-2-3-1001"), &roots(&["  "]))
            .await;
        assert!(blank_roots.is_err());

        let no_name = resolver
            .resolve_identifier_for_name("   ", &roots(&["DC=corp"]))
            .await;
        assert!(matches!(
            no_name,
            Err(IdentityError::Configuration { field: "name", .. })
        ));
    }
}
