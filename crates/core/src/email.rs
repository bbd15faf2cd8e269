//! Case-normalized email address.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, ValueObject};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `\w` is ASCII-only here: no accented or non-Latin addresses.
    Regex::new(r"(?-u)^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("email pattern is valid")
});

/// A trimmed, lowercased, syntactically valid email address.
///
/// Uniqueness of user emails is enforced against this normalized form, so
/// `Ana@X.com` and `ana@x.com ` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {
    type Raw = str;

    fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        if !EMAIL_RE.is_match(&normalized) {
            return Err(DomainError::validation("please provide a valid email"));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
