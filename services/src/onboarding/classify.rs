//! Member/guest classification by email domain.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of directory account created for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// The email belongs to the organization's own domain.
    Member,
    /// External identity, bound through a federated sign-in identity.
    Guest,
}

impl AccountKind {
    /// Value of the directory's `userType` property.
    pub fn user_type(self) -> &'static str {
        match self {
            AccountKind::Member => "Member",
            AccountKind::Guest => "Guest",
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::Member => write!(f, "member"),
            AccountKind::Guest => write!(f, "guest"),
        }
    }
}

/// Returns `true` if `email` ends with `issuer_domain`, ignoring case.
pub fn is_issuer_email(email: &str, issuer_domain: &str) -> bool {
    email
        .to_lowercase()
        .ends_with(&issuer_domain.to_lowercase())
}

/// Classifies an email against the issuer domain.
pub fn classify(email: &str, issuer_domain: &str) -> AccountKind {
    if is_issuer_email(email, issuer_domain) {
        AccountKind::Member
    } else {
        AccountKind::Guest
    }
}
