//! Temporary access pass issuance.

use serde::Serialize;
use tracing::{info, instrument};

use super::classify::AccountKind;
use super::error::OnboardingError;
use super::provisioner::AccountRecord;
use crate::directory::{DirectoryClient, TemporaryAccessPassRequest};

/// Lifetime requested for every temporary access pass.
pub const ACCESS_PASS_LIFETIME_MINUTES: u32 = 60;

/// One-time sign-in credential for a member account.
///
/// Its lifetime is enforced by the directory, not by this service.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AccessCredential {
    pub owner_email: String,
    pub temporary_pass_code: String,
    pub validity_minutes: u32,
    pub single_use: bool,
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("owner_email", &self.owner_email)
            .field("temporary_pass_code", &"[REDACTED]")
            .field("validity_minutes", &self.validity_minutes)
            .field("single_use", &self.single_use)
            .finish()
    }
}

/// Requests a single-use, 60 minute access pass for a member account.
///
/// Guest accounts are not eligible and are rejected without a remote call.
#[instrument(skip_all, fields(user_id = %account.directory_id))]
pub async fn issue_access<C: DirectoryClient>(
    client: &C,
    account: &AccountRecord,
) -> Result<AccessCredential, OnboardingError> {
    if account.kind != AccountKind::Member {
        return Err(OnboardingError::DomainMismatch {
            email: account.user_principal_name.clone(),
            issuer_domain: account
                .user_principal_name
                .rsplit_once('@')
                .map(|(_, domain)| domain.to_owned())
                .unwrap_or_default(),
            expected: AccountKind::Member,
        });
    }

    let request = TemporaryAccessPassRequest {
        lifetime_in_minutes: ACCESS_PASS_LIFETIME_MINUTES,
        is_usable_once: true,
    };
    let pass = client
        .create_temporary_access_pass(&account.directory_id, &request)
        .await?;
    info!(
        lifetime_minutes = pass.lifetime_in_minutes,
        "Temporary access pass issued"
    );

    Ok(AccessCredential {
        owner_email: account.user_principal_name.clone(),
        temporary_pass_code: pass.temporary_access_pass,
        validity_minutes: pass.lifetime_in_minutes,
        single_use: pass.is_usable_once,
    })
}
