//! PKCE (RFC 7636) challenge computation and verification, S256 only

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// The only supported code_challenge_method
pub const CHALLENGE_METHOD: &str = "S256";

/// Compute the S256 challenge for a code verifier:
/// base64url(SHA-256(verifier)), unpadded
pub fn challenge_from_verifier(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Check a supplied verifier against a stored challenge
///
/// The comparison is constant-time.
pub fn verify(stored_challenge: &str, verifier: &str) -> bool {
    let computed = challenge_from_verifier(verifier);
    computed.as_bytes().ct_eq(stored_challenge.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verifier/challenge pair from RFC 7636 appendix B
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn known_verifier_produces_known_challenge() {
        assert_eq!(challenge_from_verifier(VERIFIER), CHALLENGE);
    }

    #[test]
    fn matching_verifier_passes() {
        assert!(verify(CHALLENGE, VERIFIER));
    }

    #[test]
    fn wrong_verifier_fails() {
        assert!(!verify(CHALLENGE, "not-the-right-verifier-at-all-no-sir"));
        assert!(!verify(CHALLENGE, ""));
    }

    #[test]
    fn challenge_is_unpadded_base64url() {
        let challenge = challenge_from_verifier("some-other-verifier");
        assert_eq!(challenge.len(), 43);
        assert!(!challenge.contains('='));
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
    }
}
