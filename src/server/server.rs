use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::client::ClientRegistry;
use crate::config::clients::VendorConfig;
use crate::config::settings::{ServerConfig, SettingsConfig};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::tokens::TokenState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub token_state: TokenState,
}

impl AppState {
    pub fn new(
        metrics: &Metrics,
        registry: Arc<ClientRegistry>,
        clients: HashMap<String, VendorConfig>,
    ) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            token_state: TokenState::new(registry, clients),
        }
    }
}

pub async fn router(
    settings_config: &SettingsConfig,
    registry: Arc<ClientRegistry>,
    clients: HashMap<String, VendorConfig>,
) -> Router {
    let state = AppState::new(get_metrics().await, registry, clients);
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(state.token_state.router())
        .with_state(state)
}

/// Serve tokens and metrics until the process receives ctrl-c.
pub async fn start(
    settings_config: &SettingsConfig,
    registry: Arc<ClientRegistry>,
    clients: HashMap<String, VendorConfig>,
) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, registry, clients).await;

    let server = settings_config.server.clone().unwrap_or(ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: "8080".to_owned(),
    });
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", server.host, server.port)).await?;
    info!(address = %server.host, port = %server.port, "server listening");
    metrics.up.set(1);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    metrics.up.set(0);
    Ok(())
}
