use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::constant_time_eq;

/// Secret half of a PKCE pair. Only ever held in memory for one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CodeVerifier").field(&"<redacted>").finish()
    }
}

/// Public half of a PKCE pair: `base64url(sha256(verifier))` without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn from_verifier(verifier: &CodeVerifier) -> Self {
        let hash = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const LOCAL_STATE_PREFIX: &str = "local-";
pub const REMOTE_STATE_PREFIX: &str = "remote-";

/// Anti-CSRF token sent to the authorize endpoint and echoed back on redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct FlowState(String);

impl FlowState {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this flow is meant to be completed out of process.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with(REMOTE_STATE_PREFIX)
    }

    /// Constant-time comparison against a state echoed by the provider.
    pub fn matches(&self, echoed: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), echoed.as_bytes())
    }
}

impl fmt::Debug for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.is_remote() { "remote" } else { "local" };
        f.debug_tuple("FlowState").field(&scope).finish()
    }
}

/// Why a redirect request could not be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    StateMismatch,
    MissingParameters,
    InvalidPath,
}

impl MalformedReason {
    /// Code shown on the error page.
    pub fn code(self) -> &'static str {
        match self {
            MalformedReason::StateMismatch => "state_mismatch",
            MalformedReason::MissingParameters => "missing_arguments",
            MalformedReason::InvalidPath => "invalid_path",
        }
    }
}

/// Classification of the single redirect request of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Granted { code: String },
    Denied { error: String },
    Malformed { reason: MalformedReason },
}

/// Token set returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub scope: String,
    #[serde(skip, default = "Utc::now")]
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|ttl| self.obtained_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }
}
