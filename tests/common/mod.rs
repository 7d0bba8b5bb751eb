#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::Router;
use spotlyze::{
    config::OAuthConfig,
    management::{CredentialStore, StorageArea},
    spotify::gateway::Gateway,
};
use tokio::task::JoinHandle;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn start_mock_server(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let port = listener.local_addr().expect("mock server address").port();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://127.0.0.1:{port}"), handle)
}

/// Query strings of every request a mock endpoint received.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Recorder {
    pub fn record(&self, params: HashMap<String, String>) {
        self.calls.lock().unwrap().push(params);
    }

    pub fn calls(&self) -> Vec<HashMap<String, String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn oauth_config(token_url: String) -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client".to_string(),
        redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
        scopes: vec![
            "user-top-read".to_string(),
            "playlist-modify-private".to_string(),
        ],
        auth_url: "https://accounts.spotify.com/authorize".to_string(),
        token_url,
    }
}

/// A store holding a valid one hour credential.
pub async fn logged_in_store(area: &StorageArea) -> CredentialStore {
    let store = CredentialStore::new(area.clone());
    store
        .save("valid-token", Some(3600), Some("refresh-1".to_string()))
        .await
        .expect("save credential");
    store
}

pub fn gateway(base: &str, store: CredentialStore) -> Gateway {
    Gateway::new(format!("{base}/v1"), store)
}
