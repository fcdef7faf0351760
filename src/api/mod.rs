//! # API Module
//!
//! HTTP handlers of the loopback callback server that receives Spotify's
//! redirect after the user has granted (or refused) access.
//!
//! ## Endpoints
//!
//! - `GET /authorize` ([`callback`]) classifies the redirect, completes the
//!   login attempt exactly once and renders the result page.
//! - Any other path ([`invalid_path`]) is answered with a 400 error page and
//!   does not complete the attempt.
//!
//! ## Pages
//!
//! [`ResponsePage`] is a closed set of pages backed by templates compiled
//! into the binary. Error pages show a failure code, either one of the fixed
//! local codes (`state_mismatch`, `missing_arguments`, `invalid_path`) or the
//! provider's own error code, HTML-escaped.
//!
//! ## Security Considerations
//!
//! - The `state` parameter is compared in constant time.
//! - Query contents (authorization codes, states) are never logged.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use spock::api::{self, CallbackState};
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! let app = api::router(CallbackState::new(expected_state, tx));
//! ```

mod callback;
mod pages;

use axum::{Router, routing::get};

pub use callback::CALLBACK_PATH;
pub use callback::CallbackState;
pub use callback::callback;
pub use callback::classify;
pub use callback::invalid_path;
pub use pages::ResponsePage;

/// Builds the router serving a single login attempt.
pub fn router(state: CallbackState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback))
        .fallback(invalid_path)
        .with_state(state)
}
