//! PKCE verifier and S256 challenge (RFC 7636) for code-exchange flows.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method sent alongside [`challenge`].
pub const CHALLENGE_METHOD: &str = "s256";

/// Generate a random code verifier (32 bytes, base64url without padding).
#[must_use]
pub fn generate_verifier() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge for a verifier.
#[must_use]
pub fn challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
#[path = "pkce_test.rs"]
mod tests;
