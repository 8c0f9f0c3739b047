//! Directory client trait definition.

use super::error::DirectoryError;
use super::types::{
    DirectoryUser, Invitation, InvitationRequest, NewUser, TemporaryAccessPass,
    TemporaryAccessPassRequest,
};
use std::future::Future;

/// Operations the onboarding workflow needs from the directory service.
///
/// Implementations must be safe to share between concurrent requests.
/// See [module documentation](super) for the available implementations.
pub trait DirectoryClient: Clone + Send + Sync + 'static {
    /// Creates a user (member or guest, depending on the body).
    fn create_user(
        &self,
        user: &NewUser,
    ) -> impl Future<Output = Result<DirectoryUser, DirectoryError>> + Send;

    /// Sends a guest invitation.
    fn create_invitation(
        &self,
        invitation: &InvitationRequest,
    ) -> impl Future<Output = Result<Invitation, DirectoryError>> + Send;

    /// Adds a temporary access pass authentication method to a user.
    fn create_temporary_access_pass(
        &self,
        user_id: &str,
        request: &TemporaryAccessPassRequest,
    ) -> impl Future<Output = Result<TemporaryAccessPass, DirectoryError>> + Send;

    /// Counts the users in the directory.
    fn count_users(&self) -> impl Future<Output = Result<usize, DirectoryError>> + Send;
}
