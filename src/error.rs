//! Error types shared across the crate.
//!
//! Each layer owns one enum: storage failures never escape the credential
//! store (it degrades to "unauthenticated"), handshake failures carry a
//! user-facing message, and API failures distinguish the global
//! unauthorized case from errors the caller interprets itself.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage content is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Failures of the authorization handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("secure random source unavailable: {0}")]
    Entropy(String),

    #[error("returned state does not match the pending login attempt")]
    StateMismatch,

    #[error("code verifier not found for the pending login attempt")]
    MissingVerifier,

    #[error("access denied by user")]
    AccessDenied,

    #[error("authorization failed: {0}")]
    Provider(String),

    #[error("authorization code missing")]
    CodeMissing,

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),

    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// State mismatch and missing PKCE parameters fail closed; the same
    /// attempt must never be retried.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, AuthError::StateMismatch | AuthError::MissingVerifier)
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::Entropy(_) => {
                "This system cannot generate secure random values. Login is not possible.".into()
            }
            AuthError::StateMismatch => {
                "Security validation failed. Please start the login again.".into()
            }
            AuthError::MissingVerifier => {
                "Authentication parameters not found. Please start the login again.".into()
            }
            AuthError::AccessDenied => {
                "Access denied. You need to authorize the application to continue.".into()
            }
            AuthError::Provider(_) => "Error during authentication. Please try again.".into(),
            AuthError::CodeMissing => {
                "Authorization code not found in the Spotify response.".into()
            }
            AuthError::Exchange(description) => {
                format!("Authentication error: Token exchange failed: {}", description)
            }
            AuthError::NoRefreshToken => "No refresh token stored. Please log in again.".into(),
            AuthError::InvalidEndpoint(e) => format!("Invalid Spotify endpoint configured: {}", e),
            AuthError::Storage(e) => format!("Cannot store credentials: {}", e),
            AuthError::Network(e) => format!("Authentication error: {}", e),
        }
    }
}

/// Failures of authenticated API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The stored credential has already been cleared when this is returned.
    #[error("session expired or revoked")]
    Unauthorized,

    #[error("access forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by Spotify")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Spotify returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid request url: {0}")]
    Url(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Session expired. Please log in again.".into(),
            ApiError::Forbidden(_) => {
                "Access denied. Check that you have the required permissions.".into()
            }
            ApiError::NotFound(_) => "The requested resource was not found.".into(),
            ApiError::RateLimited {
                retry_after: Some(wait),
            } => format!(
                "Too many requests. Wait {} seconds and try again.",
                wait.as_secs().max(1)
            ),
            ApiError::RateLimited { retry_after: None } => {
                "Too many requests. Wait a moment and try again.".into()
            }
            ApiError::Status { message, .. } => format!("Spotify error: {}", message),
            ApiError::Transport(e) => format!("Network error: {}", e),
            ApiError::Decode(_) => "Spotify sent an unexpected response.".into(),
            ApiError::Url(e) => format!("Invalid request: {}", e),
        }
    }
}
