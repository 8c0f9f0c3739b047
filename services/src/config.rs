use crate::directory::{GraphCredentials, GraphEndpoints};
use crate::onboarding::OnboardingConfig;
use onboarding_utils::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "internal")]
    Internal,
    #[serde(rename = "prod")]
    Prod,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => RuntimeEnv::Local,
            Env::Test => RuntimeEnv::Test,
            Env::Internal => RuntimeEnv::Internal,
            Env::Prod => RuntimeEnv::Prod,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Test => write!(f, "test"),
            Env::Internal => write!(f, "internal"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

const DEFAULT_SETTLE_DELAY_SECS: u64 = 5;
const DEFAULT_ACCESS_RETRY_ATTEMPTS: u32 = 4;
const DEFAULT_ACCESS_RETRY_BACKOFF_SECS: u64 = 2;

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    server_addr: String,
    port: u16,
    // Organization's own email domain; decides member vs guest
    issuer_domain: String,
    // Graph application registration, absent only in local/test
    graph_credentials: Option<GraphCredentials>,
    graph_endpoints: GraphEndpoints,
    settle_delay: Duration,
    access_retry_attempts: u32,
    access_retry_backoff: Duration,
    invite_redirect_url: Option<String>,
}

// An intermediate struct for deserializing environment variables
// where most fields are optional.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    server_addr: Option<String>,
    port: Option<u16>,
    issuer_domain: Option<String>,
    graph_tenant_id: Option<String>,
    graph_client_id: Option<String>,
    graph_client_secret: Option<String>,
    graph_endpoint: Option<String>,
    graph_login_endpoint: Option<String>,
    settle_delay_secs: Option<u64>,
    access_retry_attempts: Option<u32>,
    access_retry_backoff_secs: Option<u64>,
    invite_redirect_url: Option<String>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Uses `issuer.com` as issuer domain and no settling delay.
    /// It should not be used in production code.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            issuer_domain: "issuer.com".to_owned(),
            graph_credentials: None,
            graph_endpoints: GraphEndpoints::default(),
            settle_delay: Duration::ZERO,
            access_retry_attempts: DEFAULT_ACCESS_RETRY_ATTEMPTS,
            access_retry_backoff: Duration::ZERO,
            invite_redirect_url: None,
        }
    }

    /// Test configuration with guest invitations enabled.
    pub fn new_for_test_with_invitations(redirect_url: impl Into<String>) -> Self {
        Self {
            invite_redirect_url: Some(redirect_url.into()),
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self.env, Env::Prod)
    }

    pub fn issuer_domain(&self) -> &str {
        &self.issuer_domain
    }

    pub fn graph_credentials(&self) -> Option<&GraphCredentials> {
        self.graph_credentials.as_ref()
    }

    pub fn graph_endpoints(&self) -> &GraphEndpoints {
        &self.graph_endpoints
    }

    pub fn invite_redirect_url(&self) -> Option<&str> {
        self.invite_redirect_url.as_deref()
    }

    /// Workflow settings derived from this configuration.
    pub fn onboarding(&self) -> OnboardingConfig {
        let config = OnboardingConfig::new(self.issuer_domain.clone())
            .with_settle_delay(self.settle_delay)
            .with_access_retry(self.access_retry_attempts, self.access_retry_backoff);
        match &self.invite_redirect_url {
            Some(url) => config.with_invite_redirect_url(url.clone()),
            None => config,
        }
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            server_addr,
            port,
            issuer_domain,
            graph_tenant_id,
            graph_client_id,
            graph_client_secret,
            graph_endpoint,
            graph_login_endpoint,
            settle_delay_secs,
            access_retry_attempts,
            access_retry_backoff_secs,
            invite_redirect_url,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // Required in every environment, there is no default issuer
        let issuer_domain = match issuer_domain.map(|d| d.trim().to_owned()) {
            Some(domain) if !domain.is_empty() => domain,
            _ => anyhow::bail!("ISSUER_DOMAIN must be set for {} environment", env),
        };

        let graph_credentials = match (graph_tenant_id, graph_client_id, graph_client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(GraphCredentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            (None, None, None) if matches!(env, Env::Local | Env::Test) => {
                info!(
                    "Graph credentials not set, using the in-memory directory for {} environment",
                    env
                );
                None
            }
            _ => anyhow::bail!(
                "GRAPH_TENANT_ID, GRAPH_CLIENT_ID and GRAPH_CLIENT_SECRET must all be set for {} environment",
                env
            ),
        };

        let defaults = GraphEndpoints::default();
        let graph_endpoints = GraphEndpoints {
            graph: graph_endpoint.unwrap_or(defaults.graph),
            login: graph_login_endpoint.unwrap_or(defaults.login),
        };

        Ok(Config {
            env,
            server_addr,
            port,
            issuer_domain,
            graph_credentials,
            graph_endpoints,
            settle_delay: Duration::from_secs(
                settle_delay_secs.unwrap_or(DEFAULT_SETTLE_DELAY_SECS),
            ),
            access_retry_attempts: access_retry_attempts.unwrap_or(DEFAULT_ACCESS_RETRY_ATTEMPTS),
            access_retry_backoff: Duration::from_secs(
                access_retry_backoff_secs.unwrap_or(DEFAULT_ACCESS_RETRY_BACKOFF_SECS),
            ),
            invite_redirect_url,
        })
    }
}
