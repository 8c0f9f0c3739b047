//! User onboarding workflow.
//!
//! - [`classify`]: member/guest decision from the email domain
//! - [`provisioner`]: account creation and guest invitations
//! - [`access`]: temporary access pass issuance for members
//! - [`orchestrator`]: the end-to-end flow behind the admin page

pub mod access;
pub mod classify;
pub mod error;
pub mod orchestrator;
pub mod password;
pub mod provisioner;

pub use access::{ACCESS_PASS_LIFETIME_MINUTES, AccessCredential, issue_access};
pub use classify::{AccountKind, classify};
pub use error::OnboardingError;
pub use orchestrator::{Onboarding, OnboardingConfig, OnboardingOutcome, OnboardingState};
pub use provisioner::{
    AccountRecord, GuestInvitation, UserProfile, guest_principal_name, invite_guest, provision,
    provision_as,
};
