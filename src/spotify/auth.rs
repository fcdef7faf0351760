use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Config,
    error::{AuthError, Result},
    management::CredentialStore,
    server::CallbackServer,
    spotify::{
        authorize::build_authorize_url,
        pkce::{generate_pkce_pair, generate_state},
        token::TokenExchanger,
    },
    types::{AuthorizationOutcome, TokenSet},
};

/// Drives PKCE logins and refreshes against Spotify.
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: Config,
    exchanger: TokenExchanger,
}

impl Authenticator {
    pub fn new(config: Config) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: Config, client: Client) -> Self {
        let exchanger = TokenExchanger::new(
            client,
            config.token_url.as_str(),
            config.client_id.clone(),
            config.redirect_uri.as_str(),
        );
        Self { config, exchanger }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the complete OAuth 2.0 Authorization Code + PKCE flow.
    ///
    /// 1. **PKCE Setup**: generates a verifier/challenge pair and a local
    ///    CSRF state
    /// 2. **Server Start**: spawns the loopback callback server and waits
    ///    until it accepts connections
    /// 3. **Browser Launch**: hands the authorize URL to `launch`, which
    ///    normally opens the user's browser
    /// 4. **Callback Handling**: waits for the single redirect and
    ///    classifies it
    /// 5. **Token Exchange**: trades the code and verifier for tokens
    /// 6. **Token Persistence**: stores the refresh token in `store`
    ///
    /// `launch` is never called before the listener is ready, so a fast
    /// redirect cannot hit an unbound port.
    ///
    /// # Errors
    ///
    /// Every failure aborts the attempt and leaves `store` untouched:
    /// - [`AuthError::StateMismatch`], [`AuthError::MissingParameters`] for
    ///   malformed redirects
    /// - [`AuthError::ProviderDenied`] if the user declined
    /// - [`AuthError::Timeout`] if no redirect arrived in time
    /// - [`AuthError::TokenExchangeFailed`] if the exchange failed; retrying
    ///   means calling `login` again with fresh values
    /// - [`AuthError::Bind`] if the callback port is taken
    pub async fn login<S, L>(&self, store: &S, launch: L) -> Result<TokenSet>
    where
        S: CredentialStore + ?Sized,
        L: FnOnce(&Url),
    {
        let (verifier, challenge) = generate_pkce_pair();
        let state = generate_state(false);

        let authorize_url = build_authorize_url(
            self.config.authorize_url.as_str(),
            &self.config.client_id,
            self.config.redirect_uri.as_str(),
            &self.config.scope,
            &challenge,
            &state,
        )?;

        let server = CallbackServer::start(
            self.config.callback_addr()?,
            state,
            self.config.callback_timeout,
        )
        .ready()
        .await?;
        debug!(addr = %server.local_addr(), "waiting for authorization redirect");

        launch(&authorize_url);

        let code = match server.outcome().await? {
            AuthorizationOutcome::Granted { code } => code,
            AuthorizationOutcome::Denied { error } => {
                return Err(AuthError::ProviderDenied(error));
            }
            AuthorizationOutcome::Malformed { reason } => return Err(reason.into()),
        };

        let token = self.exchanger.exchange(&code, &verifier).await?;
        store.set(&token.refresh_token).await?;
        debug!(store = store.name(), "login completed");
        Ok(token)
    }

    /// Obtains a fresh access token from the stored refresh token.
    ///
    /// A rotated refresh token replaces the stored one. If Spotify rejects
    /// the stored token it is deleted from `store`, and the caller has to
    /// log in again.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if nothing is stored
    /// - [`AuthError::InvalidStoredCredential`] if the stored token was
    ///   rejected (and has been deleted)
    /// - [`AuthError::TokenExchangeFailed`] for other failures
    pub async fn refresh<S>(&self, store: &S) -> Result<TokenSet>
    where
        S: CredentialStore + ?Sized,
    {
        let Some(refresh_token) = store.get().await? else {
            return Err(AuthError::NotAuthenticated);
        };

        match self.exchanger.refresh(&refresh_token).await {
            Ok(token) => {
                if token.refresh_token != refresh_token {
                    store.set(&token.refresh_token).await?;
                }
                Ok(token)
            }
            Err(AuthError::InvalidStoredCredential) => {
                warn!(store = store.name(), "stored refresh token rejected, removing it");
                store.delete().await?;
                Err(AuthError::InvalidStoredCredential)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the stored refresh token.
    pub async fn logout<S>(&self, store: &S) -> Result<()>
    where
        S: CredentialStore + ?Sized,
    {
        store.delete().await
    }
}
