#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::{SocketAddr, TcpListener},
    sync::Arc,
};

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use spock::config::Config;
use tokio::sync::Mutex;
use url::Url;

pub const STUB_ACCESS_TOKEN: &str = "BQD-stub-access-token";
pub const STUB_REFRESH_TOKEN: &str = "AQC-stub-refresh-token";
pub const STUB_SCOPE: &str = "user-read-playback-state streaming";

pub fn token_body() -> Value {
    json!({
        "access_token": STUB_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": STUB_REFRESH_TOKEN,
        "scope": STUB_SCOPE,
    })
}

/// Token endpoint stand-in that records every form it receives and answers
/// with a fixed status and body.
#[derive(Clone)]
pub struct StubTokenEndpoint {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn token_handler(
    State(state): State<StubState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.requests.lock().await.push(form);
    (state.status, Json(state.body.clone())).into_response()
}

impl StubTokenEndpoint {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/token", post(token_handler))
            .with_state(StubState {
                status,
                body,
                requests: Arc::clone(&requests),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn token_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/token", self.addr)).unwrap()
    }

    pub async fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().await.clone()
    }
}

/// Finds a loopback port that is currently free.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn test_config(token_url: Url) -> Config {
    let mut config = Config::new("test-client-id").unwrap();
    config.redirect_uri =
        Url::parse(&format!("http://127.0.0.1:{}/authorize", free_port())).unwrap();
    config.token_url = token_url;
    config.scope = STUB_SCOPE.to_string();
    config.callback_timeout = Some(std::time::Duration::from_secs(10));
    config
}

pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
