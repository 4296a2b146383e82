//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the OAuth
//! authorization flow. The verifier is stored server-side and sent during
//! token exchange; the challenge is included in the authorization URL so
//! the identity provider can verify the exchange request came from the
//! same party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Only S256 is supported; the `plain` method is deprecated and insecure.
pub const CHALLENGE_METHOD: &str = "S256";

/// RFC 7636 bounds on verifier length.
const VERIFIER_MIN_LEN: usize = 43;
const VERIFIER_MAX_LEN: usize = 128;

/// A verifier and its matching challenge, consistent by construction.
#[derive(Debug, Clone, Serialize)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
    pub method: &'static str,
}

/// Generate a cryptographically random PKCE code verifier.
///
/// 32 random bytes (256 bits of entropy, above the RFC minimum) encoded as
/// URL-safe base64 without padding: exactly 43 characters.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(ASCII(verifier)))`
///
/// Rejects verifiers that are empty, outside the RFC 7636 length bounds
/// [43, 128], or contain characters outside `[A-Za-z0-9\-._~]` — each a
/// distinct `Validation` error.
pub fn compute_challenge(verifier: &str) -> Result<String> {
    if verifier.is_empty() {
        return Err(Error::Validation(
            "code verifier must be a non-empty string".into(),
        ));
    }
    if verifier.len() < VERIFIER_MIN_LEN || verifier.len() > VERIFIER_MAX_LEN {
        return Err(Error::Validation(format!(
            "code verifier must be between {VERIFIER_MIN_LEN} and {VERIFIER_MAX_LEN} characters, got {}",
            verifier.len()
        )));
    }
    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
    {
        return Err(Error::Validation(
            "code verifier contains invalid characters".into(),
        ));
    }

    Ok(challenge_of(verifier))
}

/// Generate a fresh verifier and its challenge in one call.
///
/// Never regenerate a challenge without regenerating the verifier; this is
/// the one constructor that keeps the pair consistent.
pub fn generate_pair() -> PkcePair {
    let verifier = generate_verifier();
    let challenge = challenge_of(&verifier);
    PkcePair {
        verifier,
        challenge,
        method: CHALLENGE_METHOD,
    }
}

/// Check a stored challenge against a returned verifier.
///
/// Returns `false` on any malformed input rather than erroring: this runs
/// on the OAuth callback path, where a bad value means "unauthenticated",
/// never a crashed request.
pub fn verify_challenge(verifier: &str, challenge: &str) -> bool {
    match compute_challenge(verifier) {
        Ok(expected) => expected == challenge,
        Err(_) => false,
    }
}

/// SHA-256 + base64url, no validation. Callers validate first.
fn challenge_of(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
