//! # CLI Module
//!
//! This module provides the command-line interface layer for Spotlyze. It
//! implements all user-facing commands and coordinates between the Spotify
//! integration layer, the credential store and user interaction.
//!
//! ## Command Categories
//!
//! ### Session
//!
//! - [`auth`] - Logs in through the OAuth 2.0 PKCE flow in the browser
//! - [`logout`] - Removes the stored session
//! - [`status`] - Shows whether a valid session is stored
//! - [`refresh`] - Extends the session with the stored refresh token
//!
//! ### Listening Data
//!
//! - [`profile`] - Shows the user's profile
//! - [`top_artists`] / [`top_tracks`] - Ranked lists per time range
//! - [`recent`] - Recently played tracks, optionally limited to a period
//!
//! ### Analysis
//!
//! - [`features`] - Average audio features of tracks, a playlist or top tracks
//! - [`generate`] - Creates a recommendation playlist tuned to the user's taste
//! - [`list_playlists`] - Lists the user's playlists
//!
//! ## Error Handling
//!
//! Commands print a human-readable message and exit on failure. An expired or
//! revoked session always ends with a hint to run `spotlyze auth`; partial
//! audio-feature results are reported as a ratio instead of an error.
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotlyze auth                              # Log in with Spotify
//! spotlyze top tracks --time-range short-term
//! spotlyze features --playlist 37i9dQZF1DXcBWIGoYBM5M
//! spotlyze playlist generate --limit 30
//! ```

mod auth;
mod features;
mod playlist;
mod profile;

pub use auth::auth;
pub use auth::logout;
pub use auth::refresh;
pub use auth::status;
pub use features::FeatureSource;
pub use features::features;
pub use playlist::generate;
pub use playlist::list as list_playlists;
pub use profile::profile;
pub use profile::recent;
pub use profile::top_artists;
pub use profile::top_tracks;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config, error,
    error::ApiError,
    management::{CredentialStore, FileStorage, StorageArea},
    spotify::gateway::Gateway,
};

pub(crate) fn credential_store() -> CredentialStore {
    CredentialStore::new(StorageArea::file(FileStorage::default_path()))
}

pub(crate) fn gateway() -> Gateway {
    Gateway::new(config::spotify_api_url(), credential_store())
}

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

pub(crate) fn api_failure(e: ApiError) -> ! {
    match e {
        ApiError::Unauthorized => error!("Session expired. Please run spotlyze auth."),
        other => error!("{}", other.user_message()),
    }
}
