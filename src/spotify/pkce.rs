use rand::{Rng, TryRngCore, distr::Alphanumeric, rngs::OsRng};

use crate::types::{
    CodeChallenge, CodeVerifier, FlowState, LOCAL_STATE_PREFIX, REMOTE_STATE_PREFIX,
};

pub const CODE_VERIFIER_MIN_LENGTH: usize = 43;
pub const CODE_VERIFIER_MAX_LENGTH: usize = 128;
pub const CODE_VERIFIER_CHARACTERS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._~";

pub const STATE_RANDOM_LENGTH: usize = 64;

/// Generates a fresh PKCE verifier together with its S256 challenge.
///
/// The verifier length is drawn uniformly from `43..=128` and each character
/// uniformly from the RFC 7636 unreserved alphabet, both using the operating
/// system's random source rather than a seeded generator.
///
/// # Panics
///
/// Panics if the operating system cannot provide random bytes. There is no
/// meaningful way to continue a login without secure randomness.
///
/// # Example
///
/// ```
/// let (verifier, challenge) = generate_pkce_pair();
/// assert_eq!(challenge, CodeChallenge::from_verifier(&verifier));
/// ```
pub fn generate_pkce_pair() -> (CodeVerifier, CodeChallenge) {
    let verifier = generate_code_verifier();
    let challenge = CodeChallenge::from_verifier(&verifier);
    (verifier, challenge)
}

pub fn generate_code_verifier() -> CodeVerifier {
    let mut rng = OsRng.unwrap_err();
    let length = rng.random_range(CODE_VERIFIER_MIN_LENGTH..=CODE_VERIFIER_MAX_LENGTH);

    let verifier: String = (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CODE_VERIFIER_CHARACTERS.len());
            char::from(CODE_VERIFIER_CHARACTERS[idx])
        })
        .collect();

    CodeVerifier::new(verifier)
}

/// Generates an unguessable CSRF state tagged with the flow scope.
///
/// Only local flows are completed in-process; `remote` marks a flow finished
/// by some other process and is carried verbatim through the redirect.
pub fn generate_state(remote: bool) -> FlowState {
    let suffix: String = OsRng
        .unwrap_err()
        .sample_iter(Alphanumeric)
        .take(STATE_RANDOM_LENGTH)
        .map(char::from)
        .collect();

    let prefix = if remote {
        REMOTE_STATE_PREFIX
    } else {
        LOCAL_STATE_PREFIX
    };
    FlowState::new(format!("{prefix}{suffix}"))
}
