//! API server: mounts the management routes next to the operational probes.

use crate::rest::{self, AppState};
use axum::routing::get;
use axum::Router;
use mailport_core::config::AppConfig;
use mailport_management::{management_router, ManagementState};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    management: ManagementState,
}

impl ApiServer {
    pub fn new(config: AppConfig, management: ManagementState) -> Self {
        Self { config, management }
    }

    /// The complete application router.
    pub fn router(&self) -> Router {
        let state = AppState {
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let ops = Router::new()
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .with_state(state);

        Router::new()
            .merge(ops)
            .merge(management_router(self.management.clone()))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the HTTP server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
