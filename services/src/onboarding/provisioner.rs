//! Account creation in the directory.
//!
//! Builds the member or guest creation request for a [`UserProfile`] and
//! submits it. Domain checks run before anything is sent, so a rejected
//! profile never reaches the directory. Creation is not idempotent:
//! submitting the same profile twice creates two accounts.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::classify::{AccountKind, classify, is_issuer_email};
use super::error::OnboardingError;
use super::password::generate_placeholder_password;
use crate::directory::{
    DirectoryClient, InvitationRequest, NewUser, ObjectIdentity, PasswordProfile,
};

const PASSWORD_POLICIES: &str = "DisablePasswordExpiration";
const FEDERATED_SIGN_IN: &str = "federated";
const EXTERNAL_MARKER: &str = "#EXT#@";

/// Profile submitted by an administrator.
///
/// Missing fields deserialize as empty strings and are rejected by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    pub fn new(
        email: impl Into<String>,
        user_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            user_name: user_name.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn normalized(&self) -> Self {
        Self {
            email: self.email.trim().to_owned(),
            user_name: self.user_name.trim().to_owned(),
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
        }
    }

    /// `"first last"`, skipping empty parts.
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full name, or the user name when both name parts are blank.
    pub fn display_name(&self) -> String {
        let full_name = self.full_name();
        if full_name.is_empty() {
            self.user_name.trim().to_owned()
        } else {
            full_name
        }
    }

    fn validate(&self) -> Result<(), OnboardingError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(OnboardingError::InvalidProfile(
                "Email cannot be empty".to_owned(),
            ));
        }
        if !email.contains('@') {
            return Err(OnboardingError::InvalidProfile(format!(
                "Email {email} has no domain"
            )));
        }
        if self.user_name.trim().is_empty() {
            return Err(OnboardingError::InvalidProfile(
                "User name cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// The account created in the directory. Never persisted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub user_principal_name: String,
    pub directory_id: String,
    pub kind: AccountKind,
    /// Only set for guest accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

/// Result of a guest invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestInvitation {
    pub id: String,
    pub invited_user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_redeem_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Principal name of a guest: `a@b.com` in `x.com` becomes `a_b.com#EXT#@x.com`.
pub fn guest_principal_name(email: &str, issuer_domain: &str) -> String {
    format!("{}{EXTERNAL_MARKER}{issuer_domain}", email.replace('@', "_"))
}

fn password_profile(password: &str) -> PasswordProfile {
    PasswordProfile {
        password: password.to_owned(),
        force_change_password_next_sign_in: false,
    }
}

/// Creation request for an account in the issuer domain.
pub fn member_request(profile: &UserProfile, password: &str) -> NewUser {
    NewUser {
        account_enabled: true,
        user_principal_name: profile.email.clone(),
        display_name: profile.user_name.clone(),
        given_name: profile.first_name.clone(),
        surname: profile.last_name.clone(),
        mail_nickname: profile.user_name.clone(),
        user_type: AccountKind::Member.user_type().to_owned(),
        other_mails: vec![],
        identities: vec![],
        password_profile: password_profile(password),
        password_policies: PASSWORD_POLICIES.to_owned(),
    }
}

/// Creation request for an external account federated to its home domain.
pub fn guest_request(profile: &UserProfile, issuer_domain: &str, password: &str) -> NewUser {
    NewUser {
        account_enabled: true,
        user_principal_name: guest_principal_name(&profile.email, issuer_domain),
        display_name: profile.display_name(),
        given_name: profile.first_name.clone(),
        surname: profile.last_name.clone(),
        mail_nickname: profile.user_name.clone(),
        user_type: AccountKind::Guest.user_type().to_owned(),
        other_mails: vec![profile.email.clone()],
        identities: vec![ObjectIdentity {
            sign_in_type: FEDERATED_SIGN_IN.to_owned(),
            issuer: issuer_domain.to_owned(),
            issuer_assigned_id: profile.email.clone(),
        }],
        password_profile: password_profile(password),
        password_policies: PASSWORD_POLICIES.to_owned(),
    }
}

fn ensure_kind(
    profile: &UserProfile,
    kind: AccountKind,
    issuer_domain: &str,
) -> Result<(), OnboardingError> {
    let in_issuer_domain = is_issuer_email(&profile.email, issuer_domain);
    let consistent = match kind {
        AccountKind::Member => in_issuer_domain,
        AccountKind::Guest => !in_issuer_domain,
    };
    if consistent {
        Ok(())
    } else {
        Err(OnboardingError::DomainMismatch {
            email: profile.email.clone(),
            issuer_domain: issuer_domain.to_owned(),
            expected: kind,
        })
    }
}

/// Classifies the profile and creates the matching account.
pub async fn provision<C: DirectoryClient>(
    client: &C,
    profile: &UserProfile,
    issuer_domain: &str,
) -> Result<AccountRecord, OnboardingError> {
    let profile = &profile.normalized();
    let kind = classify(&profile.email, issuer_domain);
    provision_as(client, profile, kind, issuer_domain).await
}

/// Creates an account of the requested kind.
///
/// # Errors
///
/// - `InvalidProfile` / `DomainMismatch` before any remote call
/// - `RemoteService` if the directory rejects the request
#[instrument(skip_all, fields(email = %profile.email, %kind))]
pub async fn provision_as<C: DirectoryClient>(
    client: &C,
    profile: &UserProfile,
    kind: AccountKind,
    issuer_domain: &str,
) -> Result<AccountRecord, OnboardingError> {
    let profile = &profile.normalized();
    profile.validate()?;
    ensure_kind(profile, kind, issuer_domain)?;

    let password = generate_placeholder_password();
    let request = match kind {
        AccountKind::Member => member_request(profile, &password),
        AccountKind::Guest => guest_request(profile, issuer_domain, &password),
    };

    let created = client.create_user(&request).await?;
    info!(user_id = %created.id, upn = %created.user_principal_name, "Account created");

    Ok(AccountRecord {
        user_principal_name: created.user_principal_name,
        directory_id: created.id,
        kind,
        generated_password: match kind {
            AccountKind::Member => None,
            AccountKind::Guest => Some(password),
        },
    })
}

/// Sends a directory invitation to an external email.
#[instrument(skip_all, fields(email = %profile.email))]
pub async fn invite_guest<C: DirectoryClient>(
    client: &C,
    profile: &UserProfile,
    issuer_domain: &str,
    redirect_url: &str,
) -> Result<GuestInvitation, OnboardingError> {
    let profile = &profile.normalized();
    profile.validate()?;
    ensure_kind(profile, AccountKind::Guest, issuer_domain)?;

    let request = InvitationRequest {
        invited_user_email_address: profile.email.clone(),
        invited_user_display_name: profile.display_name(),
        invite_redirect_url: redirect_url.to_owned(),
        send_invitation_message: true,
        invited_user_type: AccountKind::Guest.user_type().to_owned(),
    };

    let invitation = client.create_invitation(&request).await?;
    info!(invitation_id = %invitation.id, "Guest invited");

    Ok(GuestInvitation {
        id: invitation.id,
        invited_user_email: invitation.invited_user_email_address,
        invite_redeem_url: invitation.invite_redeem_url,
        status: invitation.status,
    })
}
