//! PowerShell-backed directory and account translation adapters.
//!
//! Both adapters print one `sid|name|domain` line on a match and nothing
//! otherwise, so parsing stays independent of the host's locale.

use std::sync::Arc;

use async_trait::async_trait;
use profmig_core::process::{POWERSHELL, powershell_args, ps_quote};
use profmig_core::{
    AccountIdentity, AccountTranslator, CollaboratorError, CollaboratorResult, DirectoryEntry,
    DirectoryQuery, DirectoryService, ProcessRunner, SecurityIdentifier,
};

const LDAP_PREFIX: &str = "LDAP://";

/// Directory adapter issuing `[adsisearcher]` subtree queries.
pub struct PowerShellDirectory {
    runner: Arc<dyn ProcessRunner>,
}

impl PowerShellDirectory {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl DirectoryService for PowerShellDirectory {
    async fn find_in_root(
        &self,
        root: &str,
        query: &DirectoryQuery,
    ) -> CollaboratorResult<Option<DirectoryEntry>> {
        let script = directory_script(root, query);
        let output = self
            .runner
            .run(POWERSHELL, &powershell_args(&script))
            .await?
            .require_success(POWERSHELL, "directory search")?;
        let Some(line) = output.lines().next() else {
            return Ok(None);
        };
        let (sid, account_name, domain) = parse_account_line(line, "directory search")?;
        Ok(Some(DirectoryEntry {
            sid,
            account_name,
            domain,
        }))
    }
}

/// Translator adapter using `NTAccount.Translate` on the local host.
pub struct PowerShellTranslator {
    runner: Arc<dyn ProcessRunner>,
}

impl PowerShellTranslator {
    /// Build the adapter over a process runner.
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AccountTranslator for PowerShellTranslator {
    async fn translate(&self, account_name: &str) -> CollaboratorResult<Option<AccountIdentity>> {
        let script = format!(
            "try {{ \
             $sid = (New-Object System.Security.Principal.NTAccount({name})).Translate([System.Security.Principal.SecurityIdentifier]); \
             $account = $sid.Translate([System.Security.Principal.NTAccount]).Value; \
             $parts = $account -split '\\\\', 2; \
             if ($parts.Count -eq 2) {{ \"$($sid.Value)|$($parts[1])|$($parts[0])\" }} else {{ \"$($sid.Value)|$account|\" }} \
             }} catch {{ }}",
            name = ps_quote(account_name)
        );
        let output = self
            .runner
            .run(POWERSHELL, &powershell_args(&script))
            .await?
            .require_success(POWERSHELL, "translate account")?;
        let Some(line) = output.lines().next() else {
            return Ok(None);
        };
        let (sid, account_name, domain) = parse_account_line(line, "translate account")?;
        Ok(Some(AccountIdentity {
            sid,
            account_name,
            domain,
        }))
    }
}

fn directory_script(root: &str, query: &DirectoryQuery) -> String {
    let filter = match query {
        DirectoryQuery::AccountName(name) => {
            format!("(&(objectCategory=person)(objectClass=user)(sAMAccountName={}))", ldap_escape(name))
        }
        DirectoryQuery::Identifier(sid) => format!("(objectSid={sid})"),
    };
    let root = if root
        .get(..LDAP_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(LDAP_PREFIX))
    {
        root.to_string()
    } else {
        format!("{LDAP_PREFIX}{root}")
    };
    format!(
        "$searcher = [adsisearcher]{filter}; \
         $searcher.SearchRoot = [adsi]{root}; \
         $searcher.SearchScope = 'Subtree'; \
         $result = $searcher.FindOne(); \
         if ($result) {{ \
         $sid = New-Object System.Security.Principal.SecurityIdentifier($result.Properties['objectsid'][0], 0); \
         $domain = ''; \
         try {{ $domain = ($sid.Translate([System.Security.Principal.NTAccount]).Value -split '\\\\', 2)[0] }} catch {{ }}; \
         \"$($sid.Value)|$($result.Properties['samaccountname'][0])|$domain\" }}",
        filter = ps_quote(&filter),
        root = ps_quote(&root),
    )
}

fn ldap_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn parse_account_line(
    line: &str,
    operation: &'static str,
) -> CollaboratorResult<(SecurityIdentifier, String, Option<String>)> {
    let unexpected = || CollaboratorError::UnexpectedOutput {
        program: POWERSHELL.to_string(),
        operation,
        output: line.to_string(),
    };
    let mut parts = line.splitn(3, '|').map(str::trim);
    let sid = parts
        .next()
        .and_then(|value| SecurityIdentifier::parse(value).ok())
        .ok_or_else(unexpected)?;
    let name = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(unexpected)?
        .to_string();
    let domain = parts
        .next()
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    Ok((sid, name, domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use profmig_test_support::fixtures::sid;
    use profmig_test_support::mocks::ScriptedRunner;

    type TestResult<T> = anyhow::Result<T>;

    #[tokio::test]
    async fn directory_parses_match_and_scopes_query_to_root() -> TestResult<()> {
        let runner = Arc::new(
            ScriptedRunner::new().with_stdout("S-1-5-21-1-2-3-1001|jdoe|CORP\r\n"),
        );
        let directory = PowerShellDirectory::new(runner.clone());

        let entry = directory
            .find_in_root("OU=Staff,DC=corp,DC=local", &DirectoryQuery::AccountName("jdoe".into()))
            .await?;

        assert_eq!(
            entry,
            Some(DirectoryEntry {
                sid: sid("S-1-5-21-1-2-3-1001"),
                account_name: "jdoe".into(),
                domain: Some("CORP".into()),
            })
        );
        let calls = runner.calls();
        let script = calls[0].1.last().cloned().unwrap_or_default();
        assert_eq!(calls[0].0, POWERSHELL);
        assert!(script.contains("'LDAP://OU=Staff,DC=corp,DC=local'"));
        assert!(script.contains("(sAMAccountName=jdoe)"));
        Ok(())
    }

    #[tokio::test]
    async fn directory_returns_none_on_empty_output() -> TestResult<()> {
        let directory = PowerShellDirectory::new(Arc::new(ScriptedRunner::new()));
        let entry = directory
            .find_in_root("LDAP://DC=corp", &DirectoryQuery::Identifier(sid("S-1-5-21-1-2-3-1001")))
            .await?;
        assert_eq!(entry, None);
        Ok(())
    }

    #[tokio::test]
    async fn translator_rejects_garbled_output() {
        let translator = PowerShellTranslator::new(Arc::new(
            ScriptedRunner::new().with_stdout("not-a-sid|jdoe|CORP"),
        ));
        let result = translator.translate("jdoe").await;
        assert!(matches!(result, Err(CollaboratorError::UnexpectedOutput { .. })));
    }

    #[tokio::test]
    async fn translator_reads_identity_without_domain() -> TestResult<()> {
        let translator = PowerShellTranslator::new(Arc::new(
            ScriptedRunner::new().with_stdout("S-1-5-21-1-2-3-1001|jdoe|"),
        ));
        let identity = translator.translate("jdoe").await?;
        assert_eq!(identity.map(|identity| identity.principal()), Some("jdoe".into()));
        Ok(())
    }

    #[test]
    fn ldap_escape_neutralises_filter_metacharacters() {
        assert_eq!(ldap_escape("a*b(c)\\d"), "a\\2ab\\28c\\29\\5cd");
    }
}
