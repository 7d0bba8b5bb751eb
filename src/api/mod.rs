//! # API Module
//!
//! HTTP endpoints of the local server that receives the OAuth redirect.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives the redirect from Spotify's authorization page and
//!   hands its query to the shared [`crate::spotify::auth::HandshakeController`].
//!   Renders a short HTML page with the outcome.
//! - [`health`] - Returns application status and version.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use spotlyze::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
