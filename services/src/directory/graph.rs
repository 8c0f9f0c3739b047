//! Microsoft Graph implementation of [`DirectoryClient`].
//!
//! Authenticates with the OAuth2 client credentials flow and caches the
//! access token until shortly before it expires.

use super::error::DirectoryError;
use super::traits::DirectoryClient;
use super::types::{
    DirectoryUser, Invitation, InvitationRequest, NewUser, ODataError, ODataPage,
    TemporaryAccessPass, TemporaryAccessPassRequest,
};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Page size used when walking the user collection.
const USER_PAGE_SIZE: u32 = 999;

/// Application registration used to call Graph.
#[derive(Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Base URLs for the Graph API and the token endpoint.
#[derive(Debug, Clone)]
pub struct GraphEndpoints {
    /// Graph base including the API version, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph: String,
    /// Identity platform authority, e.g. `https://login.microsoftonline.com`.
    pub login: String,
}

impl Default for GraphEndpoints {
    fn default() -> Self {
        Self {
            graph: DEFAULT_GRAPH_ENDPOINT.to_owned(),
            login: DEFAULT_LOGIN_ENDPOINT.to_owned(),
        }
    }
}

impl GraphEndpoints {
    /// Graph scope requested for app-only tokens.
    fn scope(&self) -> String {
        let root = self
            .graph
            .trim_end_matches('/')
            .rsplit_once('/')
            .map(|(root, _version)| root)
            .unwrap_or(&self.graph);
        format!("{root}/.default")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

struct Inner {
    http: Client,
    credentials: GraphCredentials,
    endpoints: GraphEndpoints,
    token: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

/// Graph-backed directory client. Cheap to clone.
#[derive(Clone)]
pub struct GraphDirectoryClient {
    inner: Arc<Inner>,
}

impl GraphDirectoryClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        credentials: GraphCredentials,
        endpoints: GraphEndpoints,
    ) -> Result<Self, DirectoryError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DirectoryError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                credentials,
                endpoints,
                token: RwLock::new(None),
                grace_period: Duration::minutes(5),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.endpoints.graph.trim_end_matches('/'), path)
    }

    /// Returns a valid access token, acquiring a new one when needed.
    async fn access_token(&self) -> Result<String, DirectoryError> {
        {
            let cache = self.inner.token.read().await;
            if let Some(token) = cache.as_ref()
                && !token.is_expired(self.inner.grace_period)
            {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Refreshing Graph access token");
        let token = self.acquire_token().await?;
        let access_token = token.access_token.clone();
        *self.inner.token.write().await = Some(token);
        Ok(access_token)
    }

    #[instrument(skip(self), fields(tenant_id = %self.inner.credentials.tenant_id))]
    async fn acquire_token(&self) -> Result<CachedToken, DirectoryError> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.inner.endpoints.login.trim_end_matches('/'),
            self.inner.credentials.tenant_id
        );
        let scope = self.inner.endpoints.scope();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.inner.credentials.client_id.as_str()),
            ("client_secret", self.inner.credentials.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .inner
            .http
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Failed to parse token response: {e}")))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    async fn invalidate_token(&self) {
        *self.inner.token.write().await = None;
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, DirectoryError> {
        let token = self.access_token().await?;
        let mut request = self
            .inner
            .http
            .request(method, url)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
        }
        Err(error_from_response(response).await)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DirectoryError> {
        let response = self.send(Method::POST, &self.url(path), Some(body)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, DirectoryError> {
        let response = self.send(Method::GET, url, None::<&()>).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Converts a non-success response into [`DirectoryError::Api`].
async fn error_from_response(response: Response) -> DirectoryError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let (code, message) = match serde_json::from_str::<ODataError>(&body) {
        Ok(odata) => (odata.error.code, odata.error.message),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("UnknownError")
                .to_owned(),
            body,
        ),
    };

    warn!(%status, %code, "Graph request failed");
    DirectoryError::Api {
        status,
        code,
        message,
    }
}

impl DirectoryClient for GraphDirectoryClient {
    #[instrument(skip_all, fields(upn = %user.user_principal_name, user_type = %user.user_type))]
    async fn create_user(&self, user: &NewUser) -> Result<DirectoryUser, DirectoryError> {
        let created: DirectoryUser = self.post("/users", user).await?;
        debug!(user_id = %created.id, "Directory user created");
        Ok(created)
    }

    #[instrument(skip_all, fields(email = %invitation.invited_user_email_address))]
    async fn create_invitation(
        &self,
        invitation: &InvitationRequest,
    ) -> Result<Invitation, DirectoryError> {
        self.post("/invitations", invitation).await
    }

    #[instrument(skip(self, request))]
    async fn create_temporary_access_pass(
        &self,
        user_id: &str,
        request: &TemporaryAccessPassRequest,
    ) -> Result<TemporaryAccessPass, DirectoryError> {
        let path = format!("/users/{user_id}/authentication/temporaryAccessPassMethods");
        self.post(&path, request).await
    }

    #[instrument(skip(self))]
    async fn count_users(&self) -> Result<usize, DirectoryError> {
        let mut next = Some(self.url(&format!("/users?$select=id&$top={USER_PAGE_SIZE}")));
        let mut count = 0;

        while let Some(url) = next {
            let page: ODataPage<IgnoredAny> = self.get(&url).await?;
            count += page.value.len();
            next = page.next_link;
        }

        Ok(count)
    }
}
