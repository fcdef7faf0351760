use std::sync::Arc;

use axum::extract::{Query, State};
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::{
    api::pages::ResponsePage,
    types::{AuthorizationOutcome, FlowState, MalformedReason},
};

/// Path Spotify redirects to after consent.
pub const CALLBACK_PATH: &str = "/authorize";

/// Shared state of the callback router.
///
/// The outcome sender is taken by the first request to [`CALLBACK_PATH`];
/// every later request finds `None` and cannot complete the flow again.
#[derive(Debug, Clone)]
pub struct CallbackState {
    expected_state: Arc<FlowState>,
    outcome_tx: Arc<Mutex<Option<oneshot::Sender<AuthorizationOutcome>>>>,
}

impl CallbackState {
    pub fn new(expected_state: FlowState, outcome_tx: oneshot::Sender<AuthorizationOutcome>) -> Self {
        Self {
            expected_state: Arc::new(expected_state),
            outcome_tx: Arc::new(Mutex::new(Some(outcome_tx))),
        }
    }
}

pub async fn callback(
    State(state): State<CallbackState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ResponsePage {
    let outcome = classify(&params, &state.expected_state);
    let page = ResponsePage::from(&outcome);

    match state.outcome_tx.lock().await.take() {
        Some(tx) => {
            // The receiver only disappears once the server is shutting down.
            let _ = tx.send(outcome);
        }
        None => debug!("redirect received after the login attempt completed"),
    }

    page
}

/// Answers requests to any other path without consuming the flow, so a
/// stray probe (e.g. `/favicon.ico`) cannot end the login attempt.
pub async fn invalid_path() -> ResponsePage {
    debug!("request to unexpected path ignored");
    ResponsePage::from(&AuthorizationOutcome::Malformed {
        reason: MalformedReason::InvalidPath,
    })
}

/// Classifies the query of a request to [`CALLBACK_PATH`].
///
/// Parameters with empty values count as absent and the first occurrence of
/// a repeated parameter wins.
///
/// | query                     | state matches | outcome                       |
/// |---------------------------|---------------|-------------------------------|
/// | `code` + `state`          | yes           | `Granted { code }`            |
/// | `code` + `state`          | no            | `Malformed(StateMismatch)`    |
/// | `error` + `state`         | yes           | `Denied { error }`            |
/// | `error` + `state`         | no            | `Malformed(MissingParameters)`|
/// | anything else             | -             | `Malformed(MissingParameters)`|
pub fn classify(params: &[(String, String)], expected_state: &FlowState) -> AuthorizationOutcome {
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.as_str())
    };

    match (param("code"), param("error"), param("state")) {
        (Some(code), _, Some(state)) => {
            if expected_state.matches(state) {
                AuthorizationOutcome::Granted {
                    code: code.to_string(),
                }
            } else {
                AuthorizationOutcome::Malformed {
                    reason: MalformedReason::StateMismatch,
                }
            }
        }
        (None, Some(error), Some(state)) if expected_state.matches(state) => {
            AuthorizationOutcome::Denied {
                error: error.to_string(),
            }
        }
        _ => AuthorizationOutcome::Malformed {
            reason: MalformedReason::MissingParameters,
        },
    }
}
