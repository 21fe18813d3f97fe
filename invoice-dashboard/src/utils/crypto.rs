use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// URL-safe random token carrying `bytes` bytes of entropy.
///
/// Used for the OAuth `state` parameter and the PKCE code verifier.
pub fn random_url_token(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buffer);
    general_purpose::URL_SAFE_NO_PAD.encode(buffer)
}

/// PKCE `S256` code challenge for a verifier (RFC 7636 §4.2).
pub fn pkce_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(digest)
}
