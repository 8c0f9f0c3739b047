//! Onboarding orchestration: provision, settle, issue access.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::access::{AccessCredential, issue_access};
use super::classify::{AccountKind, classify};
use super::error::OnboardingError;
use super::provisioner::{AccountRecord, GuestInvitation, UserProfile, invite_guest, provision_as};
use crate::directory::DirectoryClient;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_ACCESS_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_ACCESS_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Settings of the onboarding workflow.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    issuer_domain: String,
    settle_delay: Duration,
    access_retry_attempts: u32,
    access_retry_backoff: Duration,
    invite_redirect_url: Option<String>,
}

impl OnboardingConfig {
    pub fn new(issuer_domain: impl Into<String>) -> Self {
        Self {
            issuer_domain: issuer_domain.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            access_retry_attempts: DEFAULT_ACCESS_RETRY_ATTEMPTS,
            access_retry_backoff: DEFAULT_ACCESS_RETRY_BACKOFF,
            invite_redirect_url: None,
        }
    }

    /// Wait between account creation and the first access pass request.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Access pass attempts (at least one) and the initial backoff, doubled per retry.
    pub fn with_access_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.access_retry_attempts = attempts.max(1);
        self.access_retry_backoff = backoff;
        self
    }

    pub fn with_invite_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.invite_redirect_url = Some(url.into());
        self
    }

    pub fn issuer_domain(&self) -> &str {
        &self.issuer_domain
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn access_retry_attempts(&self) -> u32 {
        self.access_retry_attempts
    }

    pub fn access_retry_backoff(&self) -> Duration {
        self.access_retry_backoff
    }

    pub fn invite_redirect_url(&self) -> Option<&str> {
        self.invite_redirect_url.as_deref()
    }

    /// Backoff before retry number `retry` (1-based).
    fn backoff_for(&self, retry: u32) -> Duration {
        self.access_retry_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// What the administrator gets back after a successful onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OnboardingOutcome {
    Member {
        email: String,
        temporary_pass_code: String,
        credential: AccessCredential,
        account: AccountRecord,
    },
    Guest {
        email: String,
        password: String,
        account: AccountRecord,
    },
}

impl OnboardingOutcome {
    pub fn email(&self) -> &str {
        match self {
            OnboardingOutcome::Member { email, .. } | OnboardingOutcome::Guest { email, .. } => {
                email
            }
        }
    }

    pub fn account(&self) -> &AccountRecord {
        match self {
            OnboardingOutcome::Member { account, .. }
            | OnboardingOutcome::Guest { account, .. } => account,
        }
    }
}

/// Lifecycle of one form submission.
#[derive(Debug)]
pub enum OnboardingState {
    Idle,
    Submitting,
    Done(OnboardingOutcome),
    Failed(OnboardingError),
}

impl OnboardingState {
    pub fn name(&self) -> &'static str {
        match self {
            OnboardingState::Idle => "idle",
            OnboardingState::Submitting => "submitting",
            OnboardingState::Done(_) => "done",
            OnboardingState::Failed(_) => "failed",
        }
    }
}

impl From<Result<OnboardingOutcome, OnboardingError>> for OnboardingState {
    fn from(result: Result<OnboardingOutcome, OnboardingError>) -> Self {
        match result {
            Ok(outcome) => OnboardingState::Done(outcome),
            Err(err) => OnboardingState::Failed(err),
        }
    }
}

/// Runs the onboarding workflow against a directory client. Cheap to clone.
#[derive(Clone)]
pub struct Onboarding<C> {
    client: C,
    config: Arc<OnboardingConfig>,
}

impl<C: DirectoryClient> Onboarding<C> {
    pub fn new(client: C, config: OnboardingConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Drives one submission from `Submitting` to `Done` or `Failed`.
    pub async fn submit(&self, profile: &UserProfile) -> OnboardingState {
        let state = OnboardingState::Submitting;
        debug!(state = state.name(), email = %profile.email, "Onboarding submitted");

        let state = OnboardingState::from(self.onboard(profile).await);
        match &state {
            OnboardingState::Failed(err) => {
                warn!(state = state.name(), error = %err, "Onboarding failed");
            }
            _ => debug!(state = state.name(), "Onboarding finished"),
        }
        state
    }

    /// Creates the account and, for members, issues a temporary access pass.
    ///
    /// # Errors
    ///
    /// Returns `PartialProvisioning` when the account was created but no
    /// access pass could be issued. The account is not removed.
    #[instrument(skip_all, fields(email = %profile.email))]
    pub async fn onboard(
        &self,
        profile: &UserProfile,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let profile = &profile.normalized();
        let kind = classify(&profile.email, &self.config.issuer_domain);
        let account = provision_as(&self.client, profile, kind, &self.config.issuer_domain).await?;

        match kind {
            AccountKind::Member => {
                let credential = self.issue_after_settling(&account).await?;
                info!(upn = %account.user_principal_name, "Member onboarded");
                Ok(OnboardingOutcome::Member {
                    email: profile.email.clone(),
                    temporary_pass_code: credential.temporary_pass_code.clone(),
                    credential,
                    account,
                })
            }
            AccountKind::Guest => {
                let password = account.generated_password.clone().unwrap_or_default();
                info!(upn = %account.user_principal_name, "Guest onboarded");
                Ok(OnboardingOutcome::Guest {
                    email: profile.email.clone(),
                    password,
                    account,
                })
            }
        }
    }

    /// Waits for the new account to propagate, then requests its access pass.
    ///
    /// Retries with exponential backoff while the directory reports the
    /// account as missing or answers with a transient failure.
    async fn issue_after_settling(
        &self,
        account: &AccountRecord,
    ) -> Result<AccessCredential, OnboardingError> {
        if !self.config.settle_delay.is_zero() {
            debug!(delay_ms = self.config.settle_delay.as_millis() as u64, "Settling");
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let attempts = self.config.access_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match issue_access(&self.client, account).await {
                Ok(credential) => return Ok(credential),
                Err(OnboardingError::RemoteService(err)) if err.is_retryable() && attempt < attempts => {
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Access pass not yet available, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(OnboardingError::RemoteService(source)) => {
                    return Err(OnboardingError::PartialProvisioning {
                        account: account.clone(),
                        source,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Invites an external user instead of creating the account directly.
    pub async fn invite(&self, profile: &UserProfile) -> Result<GuestInvitation, OnboardingError> {
        let redirect_url = self
            .config
            .invite_redirect_url()
            .ok_or(OnboardingError::InvitationNotConfigured)?;
        invite_guest(&self.client, profile, &self.config.issuer_domain, redirect_url).await
    }

    /// Number of accounts currently in the directory.
    pub async fn count_accounts(&self) -> Result<usize, OnboardingError> {
        Ok(self.client.count_users().await?)
    }
}
