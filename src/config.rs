//! Configuration management for spock.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Everything except the client id has a
//! default that targets Spotify's production endpoints.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use url::{Host, Url};

use crate::{
    api::CALLBACK_PATH,
    error::{AuthError, Result},
};

pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8794/authorize";
pub const DEFAULT_SCOPE: &str = "user-read-playback-state user-modify-playback-state \
     user-read-currently-playing streaming playlist-read-collaborative \
     playlist-read-private user-library-read";
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

pub const ENV_CLIENT_ID: &str = "SPOTIFY_API_AUTH_CLIENT_ID";
pub const ENV_CLIENT_ID_ALIAS: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_REDIRECT_URI: &str = "SPOTIFY_API_REDIRECT_URI";
pub const ENV_SCOPE: &str = "SPOTIFY_API_AUTH_SCOPE";
pub const ENV_AUTHORIZE_URL: &str = "SPOTIFY_API_AUTH_URL";
pub const ENV_TOKEN_URL: &str = "SPOTIFY_API_TOKEN_URL";
pub const ENV_CALLBACK_TIMEOUT: &str = "SPOCK_CALLBACK_TIMEOUT_SECS";
pub const ENV_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";
pub const ENV_LOG: &str = "SPOCK_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime configuration of the login flow.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    /// Must match a redirect URI registered for the client id.
    pub redirect_uri: Url,
    /// Space separated Spotify scopes.
    pub scope: String,
    pub authorize_url: Url,
    pub token_url: Url,
    /// `None` waits for the redirect indefinitely.
    pub callback_timeout: Option<Duration>,
    /// Refresh token that takes precedence over the credential store.
    pub refresh_token_override: Option<String>,
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the directory structure if it doesn't exist. A missing `.env`
/// file is fine; every setting can also come from the process environment.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/spock/.env`
/// - macOS: `~/Library/Application Support/spock/.env`
/// - Windows: `%LOCALAPPDATA%/spock/.env`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or if the `.env`
/// file exists but cannot be parsed.
pub async fn load_env() -> Result<()> {
    load_env_from(&env_file_path()).await
}

/// Loads `path` as a `.env` file. Variables already set in the process
/// environment keep their values.
pub async fn load_env_from(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    match dotenv::from_path(path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Config(format!(
            "cannot load {}: {e}",
            path.display()
        ))),
    }
}

/// Tracing filter directives from `SPOCK_LOG`, read after [`load_env`] so
/// the `.env` file can set it too.
pub fn log_filter() -> String {
    var(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spock/.env");
    path
}

impl Config {
    /// Configuration with Spotify defaults for the given client id.
    pub fn new(client_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client_id: client_id.into(),
            redirect_uri: Url::parse(DEFAULT_REDIRECT_URI)?,
            scope: DEFAULT_SCOPE.to_string(),
            authorize_url: Url::parse(DEFAULT_AUTHORIZE_URL)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL)?,
            callback_timeout: Some(DEFAULT_CALLBACK_TIMEOUT),
            refresh_token_override: None,
        })
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if no client id is set, if a URL does not parse, if the timeout
    /// is not a whole number of seconds, or if the redirect URI cannot be
    /// served by the local callback server.
    pub fn from_env() -> Result<Self> {
        let client_id = var(ENV_CLIENT_ID)
            .or_else(|| var(ENV_CLIENT_ID_ALIAS))
            .ok_or_else(|| {
                AuthError::Config(format!("{ENV_CLIENT_ID} must be set"))
            })?;

        let mut config = Self::new(client_id)?;
        if let Some(uri) = var(ENV_REDIRECT_URI) {
            config.redirect_uri = Url::parse(&uri)?;
        }
        if let Some(scope) = var(ENV_SCOPE) {
            config.scope = scope;
        }
        if let Some(url) = var(ENV_AUTHORIZE_URL) {
            config.authorize_url = Url::parse(&url)?;
        }
        if let Some(url) = var(ENV_TOKEN_URL) {
            config.token_url = Url::parse(&url)?;
        }
        if let Some(secs) = var(ENV_CALLBACK_TIMEOUT) {
            config.callback_timeout = parse_timeout(&secs)?;
        }
        config.refresh_token_override = var(ENV_REFRESH_TOKEN);

        config.callback_addr()?;
        Ok(config)
    }

    /// Socket address the callback server binds, derived from the redirect URI.
    ///
    /// The redirect URI must use `http`, end in `/authorize`, and point at a
    /// loopback address; `localhost` is served on `127.0.0.1`.
    pub fn callback_addr(&self) -> Result<SocketAddr> {
        let uri = &self.redirect_uri;
        if uri.scheme() != "http" {
            return Err(AuthError::Config(format!(
                "redirect URI must use http, got {}",
                uri.scheme()
            )));
        }
        if uri.path() != CALLBACK_PATH {
            return Err(AuthError::Config(format!(
                "redirect URI path must be {CALLBACK_PATH}, got {}",
                uri.path()
            )));
        }

        let ip = match uri.host() {
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
            Some(Host::Domain("localhost")) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            _ => {
                return Err(AuthError::Config(format!(
                    "redirect URI host must be a loopback address: {uri}"
                )));
            }
        };
        if !ip.is_loopback() {
            return Err(AuthError::Config(format!(
                "redirect URI host must be a loopback address: {uri}"
            )));
        }

        let port = uri.port_or_known_default().unwrap_or(80);
        Ok(SocketAddr::new(ip, port))
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `0` disables the timeout.
pub fn parse_timeout(secs: &str) -> Result<Option<Duration>> {
    let secs: u64 = secs.trim().parse().map_err(|_| {
        AuthError::Config(format!("{ENV_CALLBACK_TIMEOUT} must be a number of seconds"))
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
