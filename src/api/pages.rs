use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::{types::AuthorizationOutcome, utils::escape_html};

const AUTHORIZED_HTML: &str = include_str!("templates/authorized.html");
const ERROR_HTML: &str = include_str!("templates/error.html");
const ERROR_CODE_PLACEHOLDER: &str = "{error_code}";

/// Page rendered back to the browser for a classified redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePage {
    Authorized,
    Error { code: String },
}

impl ResponsePage {
    pub fn status(&self) -> StatusCode {
        match self {
            ResponsePage::Authorized => StatusCode::OK,
            ResponsePage::Error { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn render(&self) -> String {
        match self {
            ResponsePage::Authorized => AUTHORIZED_HTML.to_string(),
            ResponsePage::Error { code } => {
                ERROR_HTML.replace(ERROR_CODE_PLACEHOLDER, &escape_html(code))
            }
        }
    }
}

impl From<&AuthorizationOutcome> for ResponsePage {
    fn from(outcome: &AuthorizationOutcome) -> Self {
        match outcome {
            AuthorizationOutcome::Granted { .. } => ResponsePage::Authorized,
            AuthorizationOutcome::Denied { error } => ResponsePage::Error {
                code: error.clone(),
            },
            AuthorizationOutcome::Malformed { reason } => ResponsePage::Error {
                code: reason.code().to_string(),
            },
        }
    }
}

impl IntoResponse for ResponsePage {
    fn into_response(self) -> Response {
        (
            self.status(),
            [
                (header::CONNECTION, "close"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            Html(self.render()),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MalformedReason;

    #[test]
    fn error_page_substitutes_escaped_code() {
        let page = ResponsePage::Error {
            code: "<script>".to_string(),
        };
        let html = page.render();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains(ERROR_CODE_PLACEHOLDER));
    }

    #[test]
    fn malformed_outcomes_map_to_fixed_codes() {
        let outcome = AuthorizationOutcome::Malformed {
            reason: MalformedReason::StateMismatch,
        };
        let page = ResponsePage::from(&outcome);
        assert_eq!(page.status(), StatusCode::BAD_REQUEST);
        assert!(page.render().contains("state_mismatch"));
    }

    #[test]
    fn granted_renders_authorized_page() {
        let outcome = AuthorizationOutcome::Granted {
            code: "abc".to_string(),
        };
        let page = ResponsePage::from(&outcome);
        assert_eq!(page.status(), StatusCode::OK);
        assert!(!page.render().contains("abc"));
    }
}
