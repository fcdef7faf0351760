mod common;

use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;
use serde_json::json;
use spock::{
    error::AuthError,
    management::{CredentialStore, MemoryCredentialStore},
    spotify::Authenticator,
    types::{CodeChallenge, CodeVerifier},
};
use tokio::sync::Mutex;
use url::Url;

use common::{
    STUB_ACCESS_TOKEN, STUB_REFRESH_TOKEN, STUB_SCOPE, StubTokenEndpoint, query_param,
    test_config, token_body,
};

/// Plays the browser: follows the authorize URL's redirect URI with the given
/// query, built from the URL's own `state` unless overridden.
fn simulate_redirect(
    url: &Url,
    query: impl FnOnce(&str) -> String + Send + 'static,
) -> tokio::task::JoinHandle<reqwest::StatusCode> {
    let redirect_uri = query_param(url, "redirect_uri").unwrap();
    let state = query_param(url, "state").unwrap();
    tokio::spawn(async move {
        let target = format!("{redirect_uri}?{}", query(&state));
        reqwest::get(target).await.unwrap().status()
    })
}

#[tokio::test]
async fn test_login_end_to_end() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let config = test_config(endpoint.token_url());
    let redirect_uri = config.redirect_uri.to_string();
    let authenticator = Authenticator::new(config);
    let store = MemoryCredentialStore::new();

    let seen_url: Arc<Mutex<Option<Url>>> = Arc::new(Mutex::new(None));
    let browser: Arc<Mutex<Option<tokio::task::JoinHandle<reqwest::StatusCode>>>> =
        Arc::new(Mutex::new(None));

    let (seen, opened) = (Arc::clone(&seen_url), Arc::clone(&browser));
    let token = authenticator
        .login(&store, move |url| {
            let handle = simulate_redirect(url, |state| format!("code=stub-code&state={state}"));
            *seen.try_lock().unwrap() = Some(url.clone());
            *opened.try_lock().unwrap() = Some(handle);
        })
        .await
        .unwrap();

    assert_eq!(token.access_token, STUB_ACCESS_TOKEN);
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);
    assert_eq!(token.refresh_token, STUB_REFRESH_TOKEN);
    assert_eq!(token.scope, STUB_SCOPE);
    assert!(!token.is_expired());

    assert_eq!(store.set_calls(), 1);
    assert_eq!(
        store.get().await.unwrap().as_deref(),
        Some(STUB_REFRESH_TOKEN)
    );

    let browser_status = browser.lock().await.take().unwrap().await.unwrap();
    assert_eq!(browser_status, reqwest::StatusCode::OK);

    // The token endpoint saw exactly one well-formed exchange whose verifier
    // hashes to the challenge that was sent to the authorize endpoint.
    let requests = endpoint.requests().await;
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["client_id"], "test-client-id");
    assert_eq!(form["code"], "stub-code");
    assert_eq!(form["redirect_uri"], redirect_uri);

    let url = seen_url.lock().await.clone().unwrap();
    assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(
        query_param(&url, "code_challenge_method").as_deref(),
        Some("S256")
    );
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client-id"));
    assert_eq!(query_param(&url, "scope").as_deref(), Some(STUB_SCOPE));
    assert!(query_param(&url, "state").unwrap().starts_with("local-"));

    let verifier = CodeVerifier::new(form["code_verifier"].clone());
    assert_eq!(
        query_param(&url, "code_challenge").unwrap(),
        CodeChallenge::from_verifier(&verifier).as_str()
    );
}

#[tokio::test]
async fn test_login_denied_stores_nothing() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::new();

    let err = authenticator
        .login(&store, |url| {
            simulate_redirect(url, |state| format!("error=access_denied&state={state}"));
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ProviderDenied(ref code) if code == "access_denied"));
    assert_eq!(store.set_calls(), 0);
    assert!(endpoint.requests().await.is_empty());
}

#[tokio::test]
async fn test_login_state_mismatch_stores_nothing() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::new();

    let err = authenticator
        .login(&store, |url| {
            simulate_redirect(url, |_| "code=stub-code&state=local-forged".to_string());
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
    assert_eq!(store.set_calls(), 0);
    assert!(endpoint.requests().await.is_empty());
}

#[tokio::test]
async fn test_login_exchange_failure_stores_nothing() {
    let endpoint = StubTokenEndpoint::start(
        StatusCode::BAD_REQUEST,
        json!({"error": "invalid_grant", "error_description": "Invalid authorization code"}),
    )
    .await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::new();

    let err = authenticator
        .login(&store, |url| {
            simulate_redirect(url, |state| format!("code=used-code&state={state}"));
        })
        .await
        .unwrap_err();

    match err {
        AuthError::TokenExchangeFailed { status, body } => {
            assert_eq!(status, Some(400));
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.set_calls(), 0);
    assert_eq!(endpoint.requests().await.len(), 1);
}

#[tokio::test]
async fn test_login_times_out_without_redirect() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let mut config = test_config(endpoint.token_url());
    config.callback_timeout = Some(Duration::from_millis(200));
    let authenticator = Authenticator::new(config);
    let store = MemoryCredentialStore::new();

    let err = authenticator.login(&store, |_| {}).await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout(_)));
    assert_eq!(store.set_calls(), 0);
}

#[tokio::test]
async fn test_refresh_replaces_rotated_token() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::with_token("old-refresh-token");

    let token = authenticator.refresh(&store).await.unwrap();

    assert_eq!(token.access_token, STUB_ACCESS_TOKEN);
    assert_eq!(store.get().await.unwrap().as_deref(), Some(STUB_REFRESH_TOKEN));
    assert_eq!(store.set_calls(), 1);

    let requests = endpoint.requests().await;
    assert_eq!(requests[0]["grant_type"], "refresh_token");
    assert_eq!(requests[0]["refresh_token"], "old-refresh-token");
    assert_eq!(requests[0]["client_id"], "test-client-id");
}

#[tokio::test]
async fn test_refresh_keeps_token_when_not_rotated() {
    let endpoint = StubTokenEndpoint::start(
        StatusCode::OK,
        json!({
            "access_token": STUB_ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": STUB_SCOPE,
        }),
    )
    .await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::with_token("kept-refresh-token");

    let token = authenticator.refresh(&store).await.unwrap();

    assert_eq!(token.refresh_token, "kept-refresh-token");
    assert_eq!(store.set_calls(), 0);
}

#[tokio::test]
async fn test_refresh_rejected_deletes_stored_token() {
    let endpoint = StubTokenEndpoint::start(
        StatusCode::BAD_REQUEST,
        json!({"error": "invalid_grant", "error_description": "Refresh token revoked"}),
    )
    .await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::with_token("revoked");

    let err = authenticator.refresh(&store).await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidStoredCredential));
    assert_eq!(store.get().await.unwrap(), None);
}

#[tokio::test]
async fn test_refresh_without_stored_token() {
    let endpoint = StubTokenEndpoint::start(StatusCode::OK, token_body()).await;
    let authenticator = Authenticator::new(test_config(endpoint.token_url()));
    let store = MemoryCredentialStore::new();

    let err = authenticator.refresh(&store).await.unwrap_err();

    assert!(matches!(err, AuthError::NotAuthenticated));
    assert!(endpoint.requests().await.is_empty());
}
