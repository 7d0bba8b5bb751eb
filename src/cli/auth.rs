use std::{sync::Arc, time::Duration};

use chrono::{Local, TimeZone};
use tokio::sync::Mutex;

use crate::{
    cli, config::OAuthConfig, error, info,
    management::{PkceStore, StorageArea},
    server::start_api_server,
    spotify::auth::{BrowserNavigator, HandshakeController, HandshakeState, SharedHandshake},
    success, warning,
};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn controller() -> HandshakeController {
    let config = match OAuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot start authentication: {}", e),
    };

    HandshakeController::new(
        config,
        cli::credential_store(),
        // the verifier only has to survive this process
        PkceStore::new(StorageArea::memory()),
        Arc::new(BrowserNavigator),
    )
}

/// Runs the PKCE login through the browser and the local callback server.
pub async fn auth(force: bool) {
    let mut controller = controller();

    if controller.credentials().load().await.is_some() {
        if !force {
            info!("Already authenticated. Use --force to log in again.");
            return;
        }
        controller.retry().await;
    }

    let handshake: SharedHandshake = Arc::new(Mutex::new(controller));

    let server_state = Arc::clone(&handshake);
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if let Err(e) = handshake.lock().await.begin_login().await {
        server.abort();
        error!("{}", e.user_message());
    }

    info!("Waiting for authorization in the browser...");
    let state = wait_for_callback(&handshake).await;
    server.abort();

    match state {
        Some(HandshakeState::Authenticated) => success!("Authentication successful!"),
        Some(HandshakeState::Failed(failure)) => {
            if failure.security {
                warning!("The login attempt was rejected for security reasons.");
            }
            error!("{}", failure.message)
        }
        _ => error!("Authentication failed or timed out."),
    }
}

async fn wait_for_callback(handshake: &SharedHandshake) -> Option<HandshakeState> {
    let started = std::time::Instant::now();

    while started.elapsed() < CALLBACK_TIMEOUT {
        let state = handshake.lock().await.state().clone();
        if state.is_terminal() {
            return Some(state);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    None
}

pub async fn logout() {
    match cli::credential_store().clear().await {
        Ok(true) => success!("Logged out."),
        Ok(false) => info!("No stored session."),
        Err(e) => error!("Cannot remove stored credentials: {}", e),
    }
}

pub async fn status() {
    let Some(credential) = cli::credential_store().load().await else {
        info!("Not authenticated. Run spotlyze auth.");
        return;
    };

    match credential
        .expires_at_ms
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
    {
        Some(expires) => success!(
            "Authenticated. Token valid until {}.",
            expires.format("%Y-%m-%d %H:%M:%S")
        ),
        None => success!("Authenticated. Token has no recorded expiry."),
    }

    if credential.refresh_token.is_some() {
        info!("A refresh token is stored; run spotlyze refresh to extend the session.");
    }
}

pub async fn refresh() {
    let controller = controller();
    match controller.refresh_session().await {
        Ok(_) => success!("Session refreshed."),
        Err(e) => error!("{}", e.user_message()),
    }
}
