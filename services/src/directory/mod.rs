//! Directory service client.
//!
//! The onboarding workflow talks to the directory through the
//! [`DirectoryClient`] trait:
//! - [`GraphDirectoryClient`]: Microsoft Graph over HTTPS (client credentials)
//! - [`MockDirectoryClient`]: in-memory implementation for tests

mod error;
mod graph;
mod mock;
mod traits;
mod types;

pub use error::DirectoryError;
pub use graph::{GraphCredentials, GraphDirectoryClient, GraphEndpoints};
pub use mock::{DirectoryCall, MockDirectoryClient};
pub use traits::DirectoryClient;
pub use types::{
    DirectoryUser, Invitation, InvitationRequest, NewUser, ObjectIdentity, PasswordProfile,
    TemporaryAccessPass, TemporaryAccessPassRequest,
};
