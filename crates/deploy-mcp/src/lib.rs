//! Deployment MCP server.
//!
//! Exposes Cloudflare, Vercel and Railway deployments as MCP tools over stdio or streamable HTTP.
//!
//! # Modules
//!
//! - [`config`]: CLI flags + YAML config file
//! - [`rate_limit`]: per-client sliding-window limiter
//! - [`dispatcher`]: tool table, rate limiting, error normalization
//! - [`tools`]: the tool handlers
//! - [`server`]: rmcp `ServerHandler`

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod rate_limit;
pub mod server;
pub mod tools;

pub use config::{Cli, DeployConfig, LogFormat, TransportKind};
pub use dispatcher::Dispatcher;
pub use error::{Result, ServerError};
pub use server::DeployServer;

use axum::Router;
use axum::routing::get;
use rate_limit::RateLimiter;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use unrelated_deploy_platforms::AdapterRegistry;
use unrelated_provider_http::{HttpTransport, ReqwestTransport};

pub const SERVER_NAME: &str = "unrelated-deploy-mcp";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global subscriber. Logs go to stderr; stdout belongs to the stdio transport.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // A second init (tests) is harmless.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Wire transport, registry, limiter and tools into a server.
///
/// # Errors
///
/// Returns an error if the outbound HTTP client cannot be built.
pub fn build_server(config: &DeployConfig) -> Result<DeployServer> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
        config.http_timeout(),
        Some(config.http.max_response_bytes),
    )?);
    let registry =
        AdapterRegistry::with_defaults(&config.endpoints, &transport, &config.enabled_platforms());
    Ok(server_for(
        registry,
        RateLimiter::new(config.rate_limit.max_requests, config.rate_limit_window()),
    ))
}

/// Server over an existing registry.
#[must_use]
pub fn server_for(registry: AdapterRegistry, limiter: RateLimiter) -> DeployServer {
    tracing::info!(
        platforms = ?registry.platforms(),
        max_requests = limiter.max_requests(),
        window_ms = u64::try_from(limiter.window().as_millis()).unwrap_or(u64::MAX),
        "deploy server configured"
    );
    let tools = Arc::new(tools::Tools::new(registry, SERVER_NAME, VERSION));
    let dispatcher = Arc::new(Dispatcher::new(tools::definitions(&tools), Arc::new(limiter)));
    DeployServer::new(dispatcher, SERVER_NAME, VERSION)
}

/// Serve one client over stdin/stdout until it disconnects.
///
/// # Errors
///
/// Returns an error if the MCP handshake or the session fails.
pub async fn serve_stdio(server: DeployServer) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let running = server.serve(rmcp::transport::stdio()).await?;
    running.waiting().await?;
    Ok(())
}

/// Router with `/health` and the streamable HTTP MCP endpoint at `/mcp`.
pub fn http_router(server: DeployServer) -> Router {
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", mcp)
}

/// Serve streamable HTTP on `bind` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve_http(
    server: DeployServer,
    bind: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| ServerError::Startup(format!("failed to bind {bind}: {e}")))?;
    tracing::info!(addr = %listener.local_addr()?, "serving MCP over streamable HTTP at /mcp");
    axum::serve(listener, http_router(server))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
