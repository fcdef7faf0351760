use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{self, Config},
    error, info,
    management::{self, CredentialStore},
    spotify::Authenticator,
    success,
    utils::mask_token,
    warning,
};

fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!(
            "{}\nSet it in your environment or in {}",
            e,
            config::env_file_path().display()
        ),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

/// Logs the user in with the PKCE flow and stores the refresh token.
///
/// The authorize URL is always printed, so the login can be finished from
/// any browser even if none can be launched. With `open_browser` the
/// default browser is opened as well. `timeout` (seconds, `0` = wait
/// forever) overrides the configured callback timeout.
///
/// Any failure prints a message and exits with status 1. Stored
/// credentials are only touched on success.
pub async fn auth(open_browser: bool, timeout: Option<u64>) {
    let mut config = load_config();
    if let Some(secs) = timeout {
        config.callback_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let store = management::default_store(config.refresh_token_override.clone());
    let authenticator = Authenticator::new(config);

    let pb = spinner();
    let waiting = pb.clone();
    let result = authenticator
        .login(&store, move |url| {
            info!(
                "Please visit the following URL in a browser where you are logged in to Spotify:\n{}",
                url
            );
            if open_browser && webbrowser::open(url.as_str()).is_err() {
                warning!("Failed to open browser. Please open the URL above manually.");
            }
            waiting.set_message("Waiting for authorization in your browser...");
            waiting.enable_steady_tick(Duration::from_millis(100));
        })
        .await;
    pb.finish_and_clear();

    match result {
        Ok(token) => success!(
            "Authentication successful! Refresh token stored in {} ({}).",
            store.name(),
            mask_token(&token.refresh_token)
        ),
        Err(e) => error!("Authentication failed: {}", e),
    }
}

/// Refreshes an access token from the stored refresh token and prints a
/// masked summary of it.
pub async fn token() {
    let config = load_config();
    let store = management::default_store(config.refresh_token_override.clone());
    let authenticator = Authenticator::new(config);

    let pb = spinner();
    pb.set_message("Refreshing access token...");
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = authenticator.refresh(&store).await;
    pb.finish_and_clear();

    match result {
        Ok(token) => {
            success!("Access token: {}", mask_token(&token.access_token));
            info!("Type: {}", token.token_type);
            info!("Expires at: {}", token.expires_at().format("%Y-%m-%d %H:%M:%S UTC"));
            info!("Scope: {}", token.scope);
        }
        Err(e) => error!("{}", e),
    }
}

/// Removes the stored refresh token.
pub async fn logout() {
    let config = load_config();
    let store = management::default_store(config.refresh_token_override.clone());

    match Authenticator::new(config).logout(&store).await {
        Ok(()) => success!("Removed stored credentials from {}.", store.name()),
        Err(e) => error!("Failed to remove credentials: {}", e),
    }
}
