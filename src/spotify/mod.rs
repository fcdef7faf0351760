//! # Spotify Integration Module
//!
//! Everything spock needs to obtain credentials from Spotify's accounts
//! service using OAuth 2.0 Authorization Code with PKCE. No client secret is
//! involved.
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (spock auth / token / logout)
//!          ↓
//! Authenticator (login, refresh, logout)
//!     ├── pkce       verifier, challenge, CSRF state
//!     ├── authorize  consent page URL
//!     ├── server     loopback redirect listener
//!     └── token      code / refresh token exchange
//!          ↓
//! CredentialStore (refresh token)
//! ```
//!
//! ## Core Modules
//!
//! - [`pkce`]: cryptographically random verifier (43-128 characters of the
//!   RFC 7636 unreserved set), its S256 challenge, and `local-`/`remote-`
//!   tagged CSRF states
//! - [`authorize`]: builds the consent-page URL
//! - [`token`]: one-shot POSTs to the token endpoint, never retried
//! - [`auth`]: the driver tying the pieces together
//!
//! ## Security Considerations
//!
//! - Verifier and state exist only in memory for a single attempt
//! - State comparison is constant time
//! - The refresh token is written only after a fully validated exchange
//! - Secrets never appear in logs or `Debug` output

pub mod auth;
pub mod authorize;
pub mod pkce;
pub mod token;

pub use auth::Authenticator;
pub use authorize::build_authorize_url;
pub use pkce::{generate_code_verifier, generate_pkce_pair, generate_state};
pub use token::TokenExchanger;
