//! Error types for the login flow and credential handling.
//!
//! Every failure of a login attempt ends up as one [`AuthError`]. The flow
//! never partially succeeds: a refresh token is only written to the
//! credential store after a fully validated exchange.

use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::types::MalformedReason;

/// Errors produced while authenticating against Spotify.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The `state` echoed by the redirect did not match the one we sent.
    #[error("Authorization state mismatch; the redirect was not initiated by this login")]
    StateMismatch,

    /// The redirect carried neither a `code`/`state` nor an `error`/`state` pair.
    #[error("Authorization redirect is missing required parameters")]
    MissingParameters,

    /// The redirect arrived on a path other than the callback path.
    #[error("Authorization redirect arrived on an unexpected path")]
    InvalidPath,

    /// The user declined, or Spotify refused the authorization request.
    #[error("Spotify denied the authorization request: {0}")]
    ProviderDenied(String),

    /// The authorization code could not be traded for tokens.
    #[error("Token exchange failed{}: {body}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    TokenExchangeFailed {
        /// HTTP status of the token endpoint, if a response was received.
        status: Option<u16>,
        /// Response body or transport error description.
        body: String,
    },

    /// Spotify rejected the stored refresh token.
    #[error("Stored refresh token was rejected by Spotify; run `spock auth` again")]
    InvalidStoredCredential,

    /// No refresh token is stored yet.
    #[error("Not authenticated; run `spock auth` first")]
    NotAuthenticated,

    /// No redirect arrived before the callback timeout expired.
    #[error("Timed out after {}s waiting for the authorization redirect", .0.as_secs())]
    Timeout(Duration),

    /// The callback listener could not bind its address.
    #[error("Failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The callback server stopped without producing an outcome.
    #[error("Callback server failed: {0}")]
    CallbackServer(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The credential store backend failed.
    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MalformedReason> for AuthError {
    fn from(reason: MalformedReason) -> Self {
        match reason {
            MalformedReason::StateMismatch => AuthError::StateMismatch,
            MalformedReason::MissingParameters => AuthError::MissingParameters,
            MalformedReason::InvalidPath => AuthError::InvalidPath,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;
