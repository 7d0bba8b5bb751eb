//! # Spotify Integration Module
//!
//! This module is the authentication and API access layer of Spotlyze. It
//! obtains an access token through the OAuth 2.0 authorization code flow with
//! PKCE and performs every Web API call through a single gateway that owns
//! bearer-token injection and the handling of revoked sessions.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI, callback server)
//!          ↓
//! Spotify Integration Layer
//!     ├── Handshake (OAuth 2.0 PKCE state machine)
//!     ├── Gateway (bearer token, 401 handling, error mapping)
//!     ├── Audio Features (sequential, throttled batches)
//!     └── User / Playlist / Search calls
//!          ↓
//! Management Layer (credential and PKCE stores)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Handshake
//!
//! [`auth::HandshakeController`] moves through
//! `Idle → Redirecting → AwaitingCallback → ExchangingCode → Authenticated | Failed`.
//! The `state` parameter is checked before the authorization code is trusted;
//! a mismatch fails closed and the attempt cannot be resumed.
//!
//! ## Error Handling
//!
//! - **Unauthorized**: the gateway clears stored credentials for every open
//!   context and returns [`crate::error::ApiError::Unauthorized`]
//! - **Rate Limiting**: 429 responses become `RateLimited` with the
//!   `Retry-After` delay when Spotify sends one
//! - **Bad Gateway**: retried a few times after a pause
//! - **Partial Batches**: a failing audio-features batch is skipped and only
//!   lowers the success count
//!
//! ## API Coverage
//!
//! - `GET /me`, `GET /me/top/{artists,tracks}`, `GET /me/playlists`,
//!   `GET /me/player/recently-played`, `GET /search`
//! - `GET /playlists/{id}`, `POST /users/{id}/playlists`,
//!   `POST /playlists/{id}/tracks`
//! - `GET /audio-features?ids=...`, `GET /recommendations`,
//!   `GET /recommendations/available-genre-seeds`
//! - `POST /api/token` (authorization code and refresh token grants)

pub mod auth;
pub mod features;
pub mod gateway;
pub mod playlist;
pub mod search;
pub mod user;
