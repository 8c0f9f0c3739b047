mod common;

use axum::http::StatusCode;
use common::{ISSUER_DOMAIN, create_test_server, create_test_server_with_invitations, profile};
use onboarding_services::{
    admin::{CountUsersResponse, ErrorResponse},
    directory::{DirectoryCall, MockDirectoryClient},
};
use serde_json::Value;

#[tokio::test]
async fn test_member_receives_single_use_access_pass() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("tst5@issuer.com", "tst5"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["kind"], "member");
    assert_eq!(body["email"], "tst5@issuer.com");
    assert_eq!(body["credential"]["validity_minutes"], 60);
    assert_eq!(body["credential"]["single_use"], true);

    let (user_id, pass) = client.issued_passes().pop().unwrap();
    assert_eq!(body["temporary_pass_code"], pass.temporary_access_pass.as_str());
    assert_eq!(
        client.calls(),
        vec![
            DirectoryCall::CreateUser {
                user_principal_name: "tst5@issuer.com".to_owned()
            },
            DirectoryCall::CreateTemporaryAccessPass { user_id },
        ]
    );

    let created = client.created_users();
    assert_eq!(created[0].user_type, "Member");
    assert_eq!(created[0].display_name, "tst5");
}

#[tokio::test]
async fn test_member_email_with_trailing_space_is_still_member() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("tst5@issuer.com ", "tst5"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["kind"], "member");
    assert_eq!(body["email"], "tst5@issuer.com");
    assert_eq!(body["account"]["user_principal_name"], "tst5@issuer.com");
    assert_eq!(client.issued_passes().len(), 1);
}

#[tokio::test]
async fn test_guest_receives_generated_password() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("ext@other.com", "ext"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["kind"], "guest");

    let created = client.created_users();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].user_type, "Guest");
    assert_eq!(
        created[0].user_principal_name,
        format!("ext_other.com#EXT#@{ISSUER_DOMAIN}")
    );
    assert_eq!(body["password"], created[0].password_profile.password.as_str());
    assert!(client.access_pass_requests().is_empty());
}

#[tokio::test]
async fn test_access_pass_waits_for_directory_propagation() {
    let client = MockDirectoryClient::new().with_propagation_lag(2);
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("tst6@issuer.com", "tst6"))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(client.access_pass_requests().len(), 3);
    assert_eq!(client.issued_passes().len(), 1);
}

#[tokio::test]
async fn test_directory_rejection_creates_nothing() {
    let client = MockDirectoryClient::new()
        .failing_user_creation(reqwest::StatusCode::BAD_REQUEST, "Request_BadRequest");
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("tst7@issuer.com", "tst7"))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "directory_error");
    assert!(body.user_principal_name.is_none());
    assert!(client.access_pass_requests().is_empty());
}

#[tokio::test]
async fn test_exhausted_access_pass_retries_report_partial_provisioning() {
    let client = MockDirectoryClient::new().with_propagation_lag(10);
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("tst8@issuer.com", "tst8"))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "credential_pending");
    assert_eq!(body.user_principal_name.as_deref(), Some("tst8@issuer.com"));
    assert_eq!(client.created_users().len(), 1);
    assert!(client.issued_passes().is_empty());
}

#[tokio::test]
async fn test_incomplete_profile_is_rejected_before_any_call() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client.clone());

    let response = server
        .post("/api/onboarding")
        .json(&profile("not-an-email", "x"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "invalid_profile");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_admin_page_round_trip() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client.clone());

    let page = server.get("/admin/onboarding").await;
    page.assert_status_ok();
    assert!(page.text().contains("tst4@issuer.com"));

    let response = server
        .post("/admin/onboarding")
        .form(&[
            ("email", "tst4@issuer.com"),
            ("user_name", "tst4"),
            ("first_name", "first-tst4"),
            ("last_name", "last-tst4"),
        ])
        .await;

    response.assert_status_ok();
    let html = response.text();
    let (_, pass) = client.issued_passes().pop().unwrap();
    assert!(html.contains(&pass.temporary_access_pass));
    assert!(html.contains("single use"));
}

#[tokio::test]
async fn test_admin_page_shows_pending_banner() {
    let client = MockDirectoryClient::new()
        .failing_access_pass(reqwest::StatusCode::FORBIDDEN, "Authorization_RequestDenied");
    let server = create_test_server(client);

    let response = server
        .post("/admin/onboarding")
        .form(&[
            ("email", "tst9@issuer.com"),
            ("user_name", "tst9"),
            ("first_name", "first"),
            ("last_name", "last"),
        ])
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let html = response.text();
    assert!(html.contains(r#"data-error="credential_pending""#));
    assert!(html.contains("tst9@issuer.com was created"));
}

#[tokio::test]
async fn test_guest_invitation() {
    let client = MockDirectoryClient::new();
    let server = create_test_server_with_invitations(client.clone());

    let response = server
        .post("/api/invitations")
        .json(&profile("ext@other.com", "ext"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["invited_user_email"], "ext@other.com");
    assert_eq!(
        client.calls(),
        vec![DirectoryCall::CreateInvitation {
            email: "ext@other.com".to_owned()
        }]
    );
}

#[tokio::test]
async fn test_invitation_for_issuer_email_is_rejected() {
    let client = MockDirectoryClient::new();
    let server = create_test_server_with_invitations(client.clone());

    let response = server
        .post("/api/invitations")
        .json(&profile("tst5@issuer.com", "tst5"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "domain_mismatch");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_count_users() {
    let client = MockDirectoryClient::new();
    let server = create_test_server(client);

    for (email, name) in [("a@issuer.com", "a"), ("b@other.com", "b")] {
        server
            .post("/api/onboarding")
            .json(&profile(email, name))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let body: CountUsersResponse = server.get("/api/users/count").await.json();
    assert_eq!(body.count, 2);
}
