//! Spotify Listening Analytics Library
//!
//! This library authenticates against Spotify with the OAuth 2.0 authorization
//! code flow with PKCE and performs authenticated reads and writes against the
//! Web API: profile, top lists, playlists and batched audio-feature lookups.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error types for storage, handshake and API failures
//! - `management` - Persistent key/value storage, credentials and PKCE state
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Handshake controller, request gateway and API calls
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE generation and other helpers
//!
//! # Example
//!
//! ```
//! use spotlyze::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> spotlyze::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the CLI layer where errors of different layers meet and are only
/// displayed. Library modules return their specific error enums from
/// [`error`].
///
/// # Example
///
/// ```
/// use spotlyze::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Analyzed {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the binary and the `cli` layer use this macro. Library code returns
/// errors instead.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues, e.g. a skipped batch or a storage file that
/// could not be read.
///
/// # Example
///
/// ```
/// warning!("Batch {} failed, continuing", index);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
