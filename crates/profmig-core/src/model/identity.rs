use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

static SID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^S-1-\d+(-\d+)+$").expect("security identifier pattern to compile")
});

/// Security identifier in its canonical string form (`S-1-5-21-...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityIdentifier(String);

impl SecurityIdentifier {
    /// Validate and wrap a security identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] when the value is not a well-formed identifier.
    pub fn parse(value: &str) -> ModelResult<Self> {
        let canonical = value.trim().to_ascii_uppercase();
        if SID_PATTERN.is_match(&canonical) {
            Ok(Self(canonical))
        } else {
            Err(ModelError::InvalidValue {
                field: "security_identifier",
                reason: "malformed",
                value: value.to_string(),
            })
        }
    }

    /// Borrow the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SecurityIdentifier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for SecurityIdentifier {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for SecurityIdentifier {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SecurityIdentifier> for String {
    fn from(value: SecurityIdentifier) -> Self {
        value.0
    }
}

/// Account resolved for a profile: identifier plus the name it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Resolved security identifier.
    pub sid: SecurityIdentifier,
    /// Account name without domain qualification.
    pub account_name: String,
    /// Owning domain, when known.
    pub domain: Option<String>,
}

impl AccountIdentity {
    /// Principal name used for ownership and ACL grants (`DOMAIN\name` when the domain is known).
    #[must_use]
    pub fn principal(&self) -> String {
        match self.domain.as_deref().filter(|domain| !domain.is_empty()) {
            Some(domain) => format!("{domain}\\{}", self.account_name),
            None => self.account_name.clone(),
        }
    }
}
