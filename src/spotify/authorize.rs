use url::Url;

use crate::{
    error::Result,
    types::{CodeChallenge, FlowState},
};

/// Builds the consent-page URL the user's browser is sent to.
///
/// Pure formatting, no network access. Any query already present on
/// `authorize_endpoint` is kept and the PKCE parameters are appended, each
/// form-encoded. `scopes` is a space separated list of Spotify scope names
/// and is passed through without validation.
///
/// # Errors
///
/// Returns [`crate::error::AuthError::InvalidUrl`] if `authorize_endpoint`
/// is not an absolute URL.
///
/// # Example
///
/// ```
/// let url = build_authorize_url(
///     "https://accounts.spotify.com/authorize",
///     "client-id",
///     "http://127.0.0.1:8794/authorize",
///     "user-read-playback-state streaming",
///     &challenge,
///     &state,
/// )?;
/// ```
pub fn build_authorize_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &str,
    challenge: &CodeChallenge,
    state: &FlowState,
) -> Result<Url> {
    let mut url = Url::parse(authorize_endpoint)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scopes)
        .append_pair("state", state.as_str())
        .append_pair("code_challenge", challenge.as_str())
        .append_pair("code_challenge_method", "S256");
    Ok(url)
}
