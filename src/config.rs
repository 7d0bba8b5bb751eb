//! Configuration management for Spotlyze.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, endpoints and the address of
//! the local callback server.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (endpoints and scopes only)

use std::{env, path::PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Scopes needed by every command of the application.
pub const DEFAULT_SCOPES: [&str; 7] = [
    "user-read-private",
    "user-read-email",
    "user-top-read",
    "user-read-recently-played",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `spotlyze/.env`. A missing file is not an error;
/// values may come from the process environment alone.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/spotlyze/.env`
/// - macOS: `~/Library/Application Support/spotlyze/.env`
/// - Windows: `%LOCALAPPDATA%/spotlyze/.env`
///
/// # Errors
///
/// This function will return an error if:
/// - The parent directory cannot be created
/// - The `.env` file exists but cannot be read or parsed
pub async fn load_env() -> Result<(), String> {
    let path = env_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn env_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotlyze/.env");
    path
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn with_default(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Returns the address for the local OAuth callback server.
///
/// Read from `SERVER_ADDRESS`, e.g. `127.0.0.1:8888`. It must match the host
/// and port of the redirect URI registered with Spotify.
pub fn server_addr() -> String {
    with_default("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Returns the Spotify API client ID from `SPOTIFY_CLIENT_ID`.
///
/// The PKCE flow needs no client secret, so none is read.
pub fn spotify_client_id() -> Result<String, ConfigError> {
    required("SPOTIFY_CLIENT_ID")
}

/// Returns the OAuth redirect URI from `SPOTIFY_REDIRECT_URI`.
///
/// This must match the redirect URI registered in the Spotify application
/// settings, e.g. `http://127.0.0.1:8888/callback`.
pub fn spotify_redirect_uri() -> Result<String, ConfigError> {
    required("SPOTIFY_REDIRECT_URI")
}

/// Returns the requested scopes.
///
/// `SPOTIFY_AUTH_SCOPE` holds a space or comma separated list; without it
/// [`DEFAULT_SCOPES`] are requested.
pub fn spotify_scopes() -> Vec<String> {
    match env::var("SPOTIFY_AUTH_SCOPE") {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

/// Returns the authorization endpoint (`SPOTIFY_AUTH_URL`).
pub fn spotify_auth_url() -> String {
    with_default("SPOTIFY_AUTH_URL", DEFAULT_AUTH_URL)
}

/// Returns the token endpoint (`SPOTIFY_TOKEN_URL`).
pub fn spotify_token_url() -> String {
    with_default("SPOTIFY_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Returns the Web API base URL (`SPOTIFY_API_URL`).
pub fn spotify_api_url() -> String {
    with_default("SPOTIFY_API_URL", DEFAULT_API_URL)
}

/// Everything the handshake needs to talk to the authorization server.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let redirect_uri = spotify_redirect_uri()?;
        if reqwest::Url::parse(&redirect_uri).is_err() {
            return Err(ConfigError::Invalid {
                name: "SPOTIFY_REDIRECT_URI",
                reason: format!("'{}' is not an absolute URL", redirect_uri),
            });
        }

        Ok(Self {
            client_id: spotify_client_id()?,
            redirect_uri,
            scopes: spotify_scopes(),
            auth_url: spotify_auth_url(),
            token_url: spotify_token_url(),
        })
    }
}
