use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr};

use crate::{api, config, spotify::auth::SharedHandshake};

pub fn router(handshake: SharedHandshake) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(handshake))
}

/// Serves the OAuth callback on `SERVER_ADDRESS` until the task is dropped.
pub async fn start_api_server(handshake: SharedHandshake) -> Result<(), String> {
    let addr = SocketAddr::from_str(&config::server_addr())
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, router(handshake))
        .await
        .map_err(|e| e.to_string())
}
