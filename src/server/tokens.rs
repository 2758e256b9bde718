use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use crate::client::ClientRegistry;
use crate::config::clients::VendorConfig;
use crate::error::Error;
use crate::server::server::AppState;

pub const TOKENS_PATH: &str = "/tokens/{client}";

#[derive(Clone)]
pub struct TokenState {
    registry: Arc<ClientRegistry>,
    clients: Arc<HashMap<String, VendorConfig>>,
}

impl TokenState {
    pub fn new(registry: Arc<ClientRegistry>, clients: HashMap<String, VendorConfig>) -> Self {
        Self {
            registry,
            clients: Arc::new(clients),
        }
    }

    pub fn router(&self) -> Router<AppState> {
        info!("served path: {}", TOKENS_PATH);
        Router::new().route(TOKENS_PATH, get(handle_token))
    }
}

async fn handle_token(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Response {
    let tokens = &state.token_state;
    let Some(config) = tokens.clients.get(&client) else {
        return (StatusCode::NOT_FOUND, format!("unknown client '{}'", client)).into_response();
    };

    let result = match tokens.registry.get_or_create(config).await {
        Ok(c) => c.access_token().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(access_token) => Json(json!({
            "client": client,
            "vendor": config.vendor,
            "access_token": access_token,
        }))
        .into_response(),
        Err(e) => {
            warn!(client = %client, "token request failed: {}", e);
            (status_for(&e), format!("Error: {}", e)).into_response()
        }
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::Upstream { .. } | Error::Transport(_) | Error::Decode(_) => StatusCode::BAD_GATEWAY,
        Error::UnsupportedOperation { .. } => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
