//! Shared test utilities for integration tests.

use axum_test::TestServer;
use onboarding_services::{config::Config, directory::MockDirectoryClient, routes};
use serde_json::{Value, json};

/// Issuer domain used by `Config::new_for_test`.
#[allow(dead_code)]
pub const ISSUER_DOMAIN: &str = "issuer.com";

/// Starts the app against an in-memory directory.
pub fn create_test_server(client: MockDirectoryClient) -> TestServer {
    TestServer::new(routes(client, Config::new_for_test())).unwrap()
}

/// Starts the app with guest invitations enabled.
#[allow(dead_code)]
pub fn create_test_server_with_invitations(client: MockDirectoryClient) -> TestServer {
    let config = Config::new_for_test_with_invitations("https://myapps.microsoft.com");
    TestServer::new(routes(client, config)).unwrap()
}

/// JSON body for an onboarding request.
#[allow(dead_code)]
pub fn profile(email: &str, user_name: &str) -> Value {
    json!({
        "email": email,
        "user_name": user_name,
        "first_name": format!("first-{user_name}"),
        "last_name": format!("last-{user_name}"),
    })
}
