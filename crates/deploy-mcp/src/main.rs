use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use unrelated_deploy_mcp::{Cli, DeployConfig, TransportKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    unrelated_deploy_mcp::init_tracing(&cli.log_level, cli.log_format);

    let config = DeployConfig::load(cli.config.as_deref())
        .and_then(|c| c.with_overrides(&cli))
        .context("load configuration")?;
    let server = unrelated_deploy_mcp::build_server(&config).context("build server")?;

    match cli.transport {
        TransportKind::Stdio => unrelated_deploy_mcp::serve_stdio(server).await,
        TransportKind::Http => {
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown requested");
                }
                signal.cancel();
            });
            unrelated_deploy_mcp::serve_http(server, cli.bind, shutdown).await
        }
    }
}
