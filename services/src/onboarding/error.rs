//! Error taxonomy for the onboarding workflow.

use super::classify::AccountKind;
use super::provisioner::AccountRecord;
use crate::directory::DirectoryError;
use thiserror::Error;

/// Errors surfaced by the onboarding workflow.
///
/// Nothing is retried or rolled back past this point; the caller decides how
/// to present each variant.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// The submitted profile is unusable. Rejected before any remote call.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// The email domain contradicts the requested account kind.
    /// Rejected before any remote call.
    #[error("Email {email} cannot be onboarded as a {expected} of {issuer_domain}")]
    DomainMismatch {
        email: String,
        issuer_domain: String,
        expected: AccountKind,
    },

    /// A directory call failed before any account was created.
    #[error("Directory request failed: {0}")]
    RemoteService(#[from] DirectoryError),

    /// The account exists but no temporary access pass could be issued.
    #[error(
        "Account {} was created but its temporary access pass is still pending: {source}",
        .account.user_principal_name
    )]
    PartialProvisioning {
        account: AccountRecord,
        source: DirectoryError,
    },

    /// Guest invitations need a redirect URL, none is configured.
    #[error("Guest invitations are not configured")]
    InvitationNotConfigured,
}

impl OnboardingError {
    /// Machine-readable error identifier used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OnboardingError::InvalidProfile(_) => "invalid_profile",
            OnboardingError::DomainMismatch { .. } => "domain_mismatch",
            OnboardingError::RemoteService(_) => "directory_error",
            OnboardingError::PartialProvisioning { .. } => "credential_pending",
            OnboardingError::InvitationNotConfigured => "invitation_not_configured",
        }
    }
}
