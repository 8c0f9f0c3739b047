use onboarding_services::{
    config::Config,
    directory::{GraphDirectoryClient, MockDirectoryClient},
    routes, telemetry,
};
use onboarding_utils::version_info::BuildInfo;
use std::net::{IpAddr, SocketAddr};
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config: Config = Config::init()?;

    // Initialize tracing
    telemetry::init_tracing(&config)?;

    // Print build information
    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        issuer_domain = %config.issuer_domain(),
        "Configuration loaded"
    );

    // Build the application router
    let route = match config.graph_credentials() {
        Some(credentials) => {
            info!(tenant_id = %credentials.tenant_id, "Using Microsoft Graph directory");
            let client =
                GraphDirectoryClient::new(credentials.clone(), config.graph_endpoints().clone())?;
            routes(client, config.clone())
        }
        None => {
            warn!("No Graph credentials configured, accounts are kept in memory");
            routes(MockDirectoryClient::new(), config.clone())
        }
    };

    // Create socket address
    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

/// Print build information
fn print_build_info() {
    let build = BuildInfo::current();
    info!("===========================================");
    info!("  Onboarding Services {}", build.version);
    info!("===========================================");
    info!("Build Date:   {}", build.date);
    info!("Build Commit: {}", build.commit);
    info!("Build Branch: {}", build.branch);
    info!("===========================================");
}
