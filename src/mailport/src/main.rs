//! Mailport: workspace-scoped subscribers, segments and invitations.
//!
//! Main entry point that loads configuration, seeds the first workspace and
//! starts the HTTP server.

use clap::Parser;
use mailport_api::ApiServer;
use mailport_core::config::AppConfig;
use mailport_management::{bootstrap_workspace, ManagementState, ManagementStore, OutboxMailer};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mailport")]
#[command(about = "Multi-tenant email marketing backend")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "MAILPORT__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "MAILPORT__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "MAILPORT__METRICS__PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailport=info,mailport_management=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Mailport starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    let store = Arc::new(ManagementStore::new());
    let boot = bootstrap_workspace(store.as_ref(), &config.bootstrap)?;
    if config.bootstrap.api_token.is_none() {
        info!(api_token = %boot.api_token, "Generated API token for the bootstrap workspace");
    }

    let mailer = Arc::new(OutboxMailer::new(config.mail.clone()));
    let management = ManagementState::new(store, mailer, config.invitations.clone());
    let api_server = ApiServer::new(config.clone(), management);

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Mailport is ready to serve traffic");

    tokio::select! {
        result = api_server.start_http() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Mailport shut down");
    Ok(())
}
