//! # CLI Module
//!
//! Command implementations behind the `spock` binary. Each command loads the
//! configuration, builds the credential store and delegates to
//! [`crate::spotify::Authenticator`], translating results into the colored
//! status lines printed by the crate's `info!`, `success!`, `warning!` and
//! `error!` macros.
//!
//! ## Commands
//!
//! - [`auth`] - PKCE login, stores the refresh token
//! - [`token`] - refresh an access token from the stored refresh token
//! - [`logout`] - forget the stored refresh token
//!
//! ## Error Handling
//!
//! Commands never return errors. Fatal failures print a human-readable
//! message and exit with status 1; the credential store is left unchanged
//! unless the operation succeeded.

mod auth;

pub use auth::auth;
pub use auth::logout;
pub use auth::token;
