//! Onboarding admin service.
//!
//! Creates accounts in the organisation directory and hands out first-use
//! credentials: members get a temporary access pass, guests get their
//! generated password.

use crate::admin::{AppState, admin_routes, api_routes};
use crate::config::Config;
use crate::directory::DirectoryClient;
use crate::onboarding::Onboarding;
use axum::{
    Router,
    extract::{Extension, Request},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use onboarding_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod admin;
pub mod config;
pub mod directory;
pub mod onboarding;
pub mod telemetry;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the application router on top of a directory client.
pub fn routes<C: DirectoryClient>(client: C, config: Config) -> Router {
    let state = AppState::new(Onboarding::new(client, config.onboarding()));

    Router::new()
        .route("/is-health", get(health_check))
        .nest("/admin", admin_routes::<C>())
        .nest("/api", api_routes::<C>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check(Extension(config): Extension<Config>) -> impl IntoResponse {
    let mut response = (StatusCode::OK, "OK").into_response();

    if let Ok(env_value) = HeaderValue::from_str(&config.environment().to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-env"), env_value);
    }

    let runtime_env: RuntimeEnv = config.environment().into();
    if let Ok(version_value) = HeaderValue::from_str(&format_version_for_runtime_env(runtime_env)) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-version"), version_value);
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
