//! spock: control Spotify from the command line.
//!
//! This library holds the authentication core of spock. It logs a local
//! user in with OAuth 2.0 Authorization Code + PKCE, captures the browser
//! redirect on a short-lived loopback server, exchanges the code for tokens
//! and keeps the refresh token in a credential store.
//!
//! # Modules
//!
//! - `api` - HTTP handlers and pages of the loopback callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error type shared by all modules
//! - `management` - Refresh token persistence
//! - `server` - Loopback server for the OAuth redirect
//! - `spotify` - PKCE generation, authorize URL, token exchange, login driver
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use spock::{config, management, spotify::Authenticator};
//!
//! #[tokio::main]
//! async fn main() -> spock::error::Result<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env()?;
//!     let store = management::default_store(config.refresh_token_override.clone());
//!     let token = Authenticator::new(config)
//!         .login(&store, |url| println!("Visit {url}"))
//!         .await?;
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

/// Prints a status line prefixed with a blue `o`.
///
/// ```
/// info!("Listening on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a status line prefixed with a green check mark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a yellow `!`. Execution continues.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a red `!` to stderr and exits with status 1.
///
/// Reserved for the CLI layer: library code returns [`error::AuthError`]
/// instead, so a failed login can never leave stored credentials half
/// written.
///
/// ```
/// error!("Authentication failed: {}", err);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}
