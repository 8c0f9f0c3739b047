//! Mock directory client for testing.

use super::error::DirectoryError;
use super::traits::DirectoryClient;
use super::types::{
    DirectoryUser, Invitation, InvitationRequest, NewUser, TemporaryAccessPass,
    TemporaryAccessPassRequest,
};
use rand::{Rng, distributions::Alphanumeric};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A call recorded by [`MockDirectoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    CreateUser { user_principal_name: String },
    CreateInvitation { email: String },
    CreateTemporaryAccessPass { user_id: String },
    CountUsers,
}

#[derive(Default)]
struct MockState {
    users: Vec<(DirectoryUser, NewUser)>,
    invitations: Vec<Invitation>,
    passes: Vec<(String, TemporaryAccessPass)>,
    calls: Vec<DirectoryCall>,
    access_pass_attempts: HashMap<String, u32>,
    user_creation_failure: Option<(StatusCode, String)>,
    access_pass_failure: Option<(StatusCode, String)>,
    propagation_lag: u32,
}

/// In-memory implementation of `DirectoryClient`.
///
/// Every call is recorded so tests can assert on call order and counts.
/// Failures and eventual-consistency lag can be injected with the builder
/// methods.
#[derive(Clone, Default)]
pub struct MockDirectoryClient {
    state: Arc<RwLock<MockState>>,
}

impl MockDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_user` call fails with the given status and `OData` code.
    pub fn failing_user_creation(self, status: StatusCode, code: impl Into<String>) -> Self {
        self.state.write().expect("lock poisoned").user_creation_failure =
            Some((status, code.into()));
        self
    }

    /// Every `create_temporary_access_pass` call fails with the given status and code.
    pub fn failing_access_pass(self, status: StatusCode, code: impl Into<String>) -> Self {
        self.state.write().expect("lock poisoned").access_pass_failure =
            Some((status, code.into()));
        self
    }

    /// New users answer 404 to the first `attempts` access pass requests.
    pub fn with_propagation_lag(self, attempts: u32) -> Self {
        self.state.write().expect("lock poisoned").propagation_lag = attempts;
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().expect("lock poisoned").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.read().expect("lock poisoned").calls.len()
    }

    /// User ids for which an access pass was requested, one entry per attempt.
    pub fn access_pass_requests(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DirectoryCall::CreateTemporaryAccessPass { user_id } => Some(user_id),
                _ => None,
            })
            .collect()
    }

    /// Request bodies of the users created so far.
    pub fn created_users(&self) -> Vec<NewUser> {
        self.state
            .read()
            .expect("lock poisoned")
            .users
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Access passes issued so far, keyed by user id.
    pub fn issued_passes(&self) -> Vec<(String, TemporaryAccessPass)> {
        self.state.read().expect("lock poisoned").passes.clone()
    }

    pub fn invitations(&self) -> Vec<Invitation> {
        self.state.read().expect("lock poisoned").invitations.clone()
    }
}

fn api_error(status: StatusCode, code: &str) -> DirectoryError {
    DirectoryError::Api {
        status,
        code: code.to_owned(),
        message: "injected by MockDirectoryClient".to_owned(),
    }
}

fn random_pass_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

impl DirectoryClient for MockDirectoryClient {
    async fn create_user(&self, user: &NewUser) -> Result<DirectoryUser, DirectoryError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.calls.push(DirectoryCall::CreateUser {
            user_principal_name: user.user_principal_name.clone(),
        });

        if let Some((status, code)) = &state.user_creation_failure {
            return Err(api_error(*status, code));
        }

        let created = DirectoryUser {
            id: Uuid::new_v4().to_string(),
            user_principal_name: user.user_principal_name.clone(),
            display_name: Some(user.display_name.clone()),
            user_type: Some(user.user_type.clone()),
        };
        state.users.push((created.clone(), user.clone()));
        Ok(created)
    }

    async fn create_invitation(
        &self,
        invitation: &InvitationRequest,
    ) -> Result<Invitation, DirectoryError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.calls.push(DirectoryCall::CreateInvitation {
            email: invitation.invited_user_email_address.clone(),
        });

        let id = Uuid::new_v4().to_string();
        let created = Invitation {
            invite_redeem_url: Some(format!(
                "{}?invitation={id}",
                invitation.invite_redirect_url
            )),
            id,
            invited_user_email_address: invitation.invited_user_email_address.clone(),
            status: Some("PendingAcceptance".to_owned()),
        };
        state.invitations.push(created.clone());
        Ok(created)
    }

    async fn create_temporary_access_pass(
        &self,
        user_id: &str,
        request: &TemporaryAccessPassRequest,
    ) -> Result<TemporaryAccessPass, DirectoryError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.calls.push(DirectoryCall::CreateTemporaryAccessPass {
            user_id: user_id.to_owned(),
        });

        if let Some((status, code)) = &state.access_pass_failure {
            return Err(api_error(*status, code));
        }

        if !state.users.iter().any(|(user, _)| user.id == user_id) {
            return Err(DirectoryError::NotFound(user_id.to_owned()));
        }

        let lag = state.propagation_lag;
        let attempts = state
            .access_pass_attempts
            .entry(user_id.to_owned())
            .or_insert(0);
        *attempts += 1;
        if *attempts <= lag {
            return Err(api_error(StatusCode::NOT_FOUND, "Request_ResourceNotFound"));
        }

        let pass = TemporaryAccessPass {
            id: Some(Uuid::new_v4().to_string()),
            temporary_access_pass: random_pass_code(),
            lifetime_in_minutes: request.lifetime_in_minutes,
            is_usable_once: request.is_usable_once,
        };
        state.passes.push((user_id.to_owned(), pass.clone()));
        Ok(pass)
    }

    async fn count_users(&self) -> Result<usize, DirectoryError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.calls.push(DirectoryCall::CountUsers);
        Ok(state.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::PasswordProfile;

    fn member(upn: &str) -> NewUser {
        NewUser {
            account_enabled: true,
            user_principal_name: upn.to_owned(),
            display_name: "tst".to_owned(),
            given_name: "first".to_owned(),
            surname: "last".to_owned(),
            mail_nickname: "tst".to_owned(),
            user_type: "Member".to_owned(),
            other_mails: vec![],
            identities: vec![],
            password_profile: PasswordProfile {
                password: "x-AC".to_owned(),
                force_change_password_next_sign_in: false,
            },
            password_policies: "DisablePasswordExpiration".to_owned(),
        }
    }

    const TAP: TemporaryAccessPassRequest = TemporaryAccessPassRequest {
        lifetime_in_minutes: 60,
        is_usable_once: true,
    };

    #[tokio::test]
    async fn test_create_user_records_call() {
        let client = MockDirectoryClient::new();
        let created = client.create_user(&member("a@issuer.com")).await.unwrap();

        assert_eq!(created.user_principal_name, "a@issuer.com");
        assert_eq!(
            client.calls(),
            vec![DirectoryCall::CreateUser {
                user_principal_name: "a@issuer.com".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn test_create_user_does_not_deduplicate() {
        let client = MockDirectoryClient::new();
        let first = client.create_user(&member("a@issuer.com")).await.unwrap();
        let second = client.create_user(&member("a@issuer.com")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(client.count_users().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_access_pass_for_unknown_user_is_not_found() {
        let client = MockDirectoryClient::new();
        let err = client
            .create_temporary_access_pass("missing", &TAP)
            .await
            .unwrap_err();

        assert!(err.is_not_yet_visible());
    }

    #[tokio::test]
    async fn test_propagation_lag() {
        let client = MockDirectoryClient::new().with_propagation_lag(2);
        let user = client.create_user(&member("a@issuer.com")).await.unwrap();

        assert!(client.create_temporary_access_pass(&user.id, &TAP).await.is_err());
        assert!(client.create_temporary_access_pass(&user.id, &TAP).await.is_err());
        let pass = client
            .create_temporary_access_pass(&user.id, &TAP)
            .await
            .unwrap();

        assert_eq!(pass.lifetime_in_minutes, 60);
        assert_eq!(client.access_pass_requests().len(), 3);
        assert_eq!(client.issued_passes().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_user_creation_failure() {
        let client = MockDirectoryClient::new()
            .failing_user_creation(StatusCode::FORBIDDEN, "Authorization_RequestDenied");
        let err = client.create_user(&member("a@issuer.com")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Api { status, .. } if status == StatusCode::FORBIDDEN));
        assert!(client.created_users().is_empty());
    }
}
