//! HTTP routes for onboarding.
//!
//! The HTML page under `/admin` and the JSON endpoints under `/api` run the
//! same [`Onboarding`] workflow.

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::page::{render_onboarding_page, sample_profile};
use crate::directory::DirectoryClient;
use crate::onboarding::{Onboarding, OnboardingError, OnboardingState, UserProfile};

/// Error response for API endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Set when an account exists even though the request failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
}

/// Response for the account count endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountUsersResponse {
    pub count: usize,
}

/// HTTP status for each onboarding failure.
pub fn status_for(err: &OnboardingError) -> StatusCode {
    match err {
        OnboardingError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
        OnboardingError::DomainMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::RemoteService(_) => StatusCode::BAD_GATEWAY,
        OnboardingError::PartialProvisioning { .. } => StatusCode::ACCEPTED,
        OnboardingError::InvitationNotConfigured => StatusCode::NOT_IMPLEMENTED,
    }
}

impl From<OnboardingError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: OnboardingError) -> Self {
        let user_principal_name = match &err {
            OnboardingError::PartialProvisioning { account, .. } => {
                Some(account.user_principal_name.clone())
            }
            _ => None,
        };

        (
            status_for(&err),
            Json(ErrorResponse {
                error: err.kind().to_owned(),
                message: err.to_string(),
                user_principal_name,
            }),
        )
    }
}

fn error_response(err: OnboardingError) -> Response {
    match &err {
        OnboardingError::RemoteService(_) | OnboardingError::PartialProvisioning { .. } => {
            tracing::error!("Onboarding failed: {}", err);
        }
        _ => tracing::warn!("Onboarding rejected: {}", err),
    }
    let (status, json): (StatusCode, Json<ErrorResponse>) = err.into();
    (status, json).into_response()
}

/// Application state shared by the onboarding handlers.
#[derive(Clone)]
pub struct AppState<C> {
    pub onboarding: Onboarding<C>,
}

impl<C: DirectoryClient> AppState<C> {
    pub fn new(onboarding: Onboarding<C>) -> Self {
        Self { onboarding }
    }
}

/// Routes for the HTML admin page.
pub fn admin_routes<C: DirectoryClient>() -> Router<AppState<C>> {
    Router::new().route(
        "/onboarding",
        get(onboarding_page::<C>).post(submit_onboarding_form::<C>),
    )
}

/// JSON routes.
pub fn api_routes<C: DirectoryClient>() -> Router<AppState<C>> {
    Router::new()
        .route("/onboarding", post(onboard_user::<C>))
        .route("/invitations", post(invite_user::<C>))
        .route("/users/count", get(count_users::<C>))
}

/// GET /admin/onboarding
///
/// Renders the form pre-populated with a sample profile in the issuer domain.
async fn onboarding_page<C: DirectoryClient>(State(state): State<AppState<C>>) -> Html<String> {
    let issuer_domain = state.onboarding.config().issuer_domain();
    Html(render_onboarding_page(
        issuer_domain,
        &sample_profile(issuer_domain),
        &OnboardingState::Idle,
    ))
}

/// POST /admin/onboarding
///
/// Runs the workflow and re-renders the page with the access summary or a
/// banner describing the failure. The status code follows the JSON API.
#[tracing::instrument(skip_all, fields(email = %form.email))]
async fn submit_onboarding_form<C: DirectoryClient>(
    State(state): State<AppState<C>>,
    Form(form): Form<UserProfile>,
) -> Response {
    let result = state.onboarding.submit(&form).await;
    let status = match &result {
        OnboardingState::Failed(err) => status_for(err),
        _ => StatusCode::OK,
    };

    let html = render_onboarding_page(state.onboarding.config().issuer_domain(), &form, &result);
    (status, Html(html)).into_response()
}

/// POST /api/onboarding
///
/// ```json
/// {
///     "email": "tst5@issuer.com",
///     "user_name": "tst5",
///     "first_name": "first",
///     "last_name": "last"
/// }
/// ```
///
/// Responds 201 with the outcome, tagged by `kind` (`member` carries
/// `temporary_pass_code`, `guest` carries `password`).
#[tracing::instrument(skip_all, fields(email = %payload.email))]
async fn onboard_user<C: DirectoryClient>(
    State(state): State<AppState<C>>,
    Json(payload): Json<UserProfile>,
) -> Response {
    tracing::info!("Onboarding user");

    match state.onboarding.onboard(&payload).await {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/invitations
#[tracing::instrument(skip_all, fields(email = %payload.email))]
async fn invite_user<C: DirectoryClient>(
    State(state): State<AppState<C>>,
    Json(payload): Json<UserProfile>,
) -> Response {
    match state.onboarding.invite(&payload).await {
        Ok(invitation) => (StatusCode::CREATED, Json(invitation)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/users/count
async fn count_users<C: DirectoryClient>(State(state): State<AppState<C>>) -> Response {
    match state.onboarding.count_accounts().await {
        Ok(count) => Json(CountUsersResponse { count }).into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::directory::MockDirectoryClient;
    use crate::routes;
    use axum::body::Body;
    use axum::http::Request;
    use reqwest::StatusCode as ReqwestStatus;
    use tower::ServiceExt;

    fn create_test_app(client: MockDirectoryClient) -> Router {
        routes(client, Config::new_for_test())
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        String::from_utf8(body.to_vec()).expect("utf-8 body")
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("Failed to create request")
    }

    #[tokio::test]
    async fn test_get_page_is_prefilled() {
        let app = create_test_app(MockDirectoryClient::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/onboarding")
                    .body(Body::empty())
                    .expect("Failed to create request"),
            )
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("tst4@issuer.com"));
    }

    #[tokio::test]
    async fn test_post_form_member() {
        let client = MockDirectoryClient::new();
        let app = create_test_app(client.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/onboarding")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "email=tst5%40issuer.com&user_name=tst5&first_name=first&last_name=last",
                    ))
                    .expect("Failed to create request"),
            )
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains(r#"id="result-code""#));

        let (_, pass) = client.issued_passes().pop().expect("one pass issued");
        assert!(html.contains(&pass.temporary_access_pass));
    }

    #[tokio::test]
    async fn test_post_form_directory_failure_shows_banner() {
        let client = MockDirectoryClient::new()
            .failing_user_creation(ReqwestStatus::FORBIDDEN, "Authorization_RequestDenied");
        let app = create_test_app(client);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/onboarding")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "email=ext%40other.com&user_name=ext&first_name=a&last_name=b",
                    ))
                    .expect("Failed to create request"),
            )
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_string(response).await;
        assert!(html.contains(r#"data-error="directory_error""#));
        // The submitted values are kept in the form.
        assert!(html.contains("ext@other.com"));
    }

    #[tokio::test]
    async fn test_api_onboard_guest() {
        let client = MockDirectoryClient::new();
        let app = create_test_app(client.clone());

        let response = app
            .oneshot(json_request(
                "/api/onboarding",
                r#"{"email":"ext@other.com","user_name":"ext","first_name":"a","last_name":"b"}"#,
            ))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(body["kind"], "guest");
        assert_eq!(body["email"], "ext@other.com");
        assert!(!body["password"].as_str().unwrap_or_default().is_empty());
        assert!(client.access_pass_requests().is_empty());
    }

    #[tokio::test]
    async fn test_api_missing_email_is_bad_request() {
        let client = MockDirectoryClient::new();
        let app = create_test_app(client.clone());

        let response = app
            .oneshot(json_request("/api/onboarding", r#"{"user_name":"x"}"#))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(body.error, "invalid_profile");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_api_invalid_json() {
        let app = create_test_app(MockDirectoryClient::new());

        let response = app
            .oneshot(json_request("/api/onboarding", "invalid json"))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_partial_provisioning_reports_account() {
        let client = MockDirectoryClient::new()
            .failing_access_pass(ReqwestStatus::FORBIDDEN, "Authorization_RequestDenied");
        let app = create_test_app(client);

        let response = app
            .oneshot(json_request(
                "/api/onboarding",
                r#"{"email":"tst5@issuer.com","user_name":"tst5","first_name":"first","last_name":"last"}"#,
            ))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body: ErrorResponse =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(body.error, "credential_pending");
        assert_eq!(body.user_principal_name.as_deref(), Some("tst5@issuer.com"));
    }

    #[tokio::test]
    async fn test_api_invitations_not_configured() {
        let app = create_test_app(MockDirectoryClient::new());

        let response = app
            .oneshot(json_request(
                "/api/invitations",
                r#"{"email":"ext@other.com","user_name":"ext","first_name":"a","last_name":"b"}"#,
            ))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_api_invitation() {
        let client = MockDirectoryClient::new();
        let app = routes(
            client.clone(),
            Config::new_for_test_with_invitations("https://myapps.microsoft.com"),
        );

        let response = app
            .oneshot(json_request(
                "/api/invitations",
                r#"{"email":"ext@other.com","user_name":"ext","first_name":"a","last_name":"b"}"#,
            ))
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(client.invitations().len(), 1);
    }

    #[tokio::test]
    async fn test_count_users() {
        let client = MockDirectoryClient::new();
        let app = create_test_app(client.clone());
        app.clone()
            .oneshot(json_request(
                "/api/onboarding",
                r#"{"email":"ext@other.com","user_name":"ext","first_name":"a","last_name":"b"}"#,
            ))
            .await
            .expect("Failed to get response");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/users/count")
                    .body(Body::empty())
                    .expect("Failed to create request"),
            )
            .await
            .expect("Failed to get response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: CountUsersResponse =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(body.count, 1);
    }
}
