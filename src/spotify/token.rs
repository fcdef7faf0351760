use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AuthError, Result},
    types::{CodeVerifier, TokenSet},
};

/// Trades authorization codes and refresh tokens for token sets.
///
/// Every call is a single POST to the token endpoint. Nothing is retried:
/// an authorization code is single use, so a failed exchange ends the login
/// attempt and a new one has to start from fresh PKCE values.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: Client,
    token_url: String,
    client_id: String,
    redirect_uri: String,
}

/// Refresh responses may omit `refresh_token` when Spotify does not rotate it.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl TokenExchanger {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Exchanges an authorization code for a token set using PKCE.
    ///
    /// Sends `client_id`, `grant_type=authorization_code`, `code`,
    /// `redirect_uri` and `code_verifier` as a form body. The verifier
    /// proves this process is the one that produced the challenge sent to
    /// the authorize endpoint.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status or undecodable body is returned
    /// as [`AuthError::TokenExchangeFailed`].
    pub async fn exchange(&self, code: &str, verifier: &CodeVerifier) -> Result<TokenSet> {
        let (status, body) = self
            .post_form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ])
            .await?;

        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let mut token: TokenSet =
            serde_json::from_str(&body).map_err(|e| AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body: format!("invalid token response: {e}"),
            })?;
        token.obtained_at = Utc::now();
        debug!(expires_in = token.expires_in, "authorization code exchanged");
        Ok(token)
    }

    /// Obtains a new access token from a stored refresh token.
    ///
    /// If Spotify does not rotate the refresh token, the given one is carried
    /// over into the returned set so callers can always store
    /// `token.refresh_token`.
    ///
    /// # Errors
    ///
    /// A 400 response (Spotify answers `invalid_grant` for revoked or expired
    /// refresh tokens) maps to [`AuthError::InvalidStoredCredential`];
    /// anything else that fails maps to [`AuthError::TokenExchangeFailed`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let (status, body) = self
            .post_form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if status == StatusCode::BAD_REQUEST {
            let error = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_default();
            debug!(%error, "refresh token rejected");
            return Err(AuthError::InvalidStoredCredential);
        }
        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let res: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body: format!("invalid token response: {e}"),
            })?;

        Ok(TokenSet {
            access_token: res.access_token,
            token_type: res.token_type,
            expires_in: res.expires_in,
            refresh_token: res
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            scope: res.scope,
            obtained_at: Utc::now(),
        })
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<(StatusCode, String)> {
        let res = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status: None,
                body: e.to_string(),
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body: e.to_string(),
            })?;
        Ok((status, body))
    }
}
