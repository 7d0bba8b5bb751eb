use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::spotify::auth::SharedHandshake;

pub async fn health(Extension(handshake): Extension<SharedHandshake>) -> Json<Value> {
    let handshake = handshake.lock().await.state().label();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "handshake": handshake,
    }))
}
