//! Confirm token generation.
//!
//! Tokens are cryptographically random and carry no embedded data; expiry is
//! tracked by the store alongside the context they reference.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;

use super::types::ConfirmationToken;

/// Number of random bytes behind each token (256 bits).
const RANDOM_BYTES_LEN: usize = 32;

/// Generate a new confirm token.
///
/// Returns a URL-safe base64 string so it can travel in a query parameter and
/// a hidden form field without further escaping.
pub fn generate_confirm_token() -> ConfirmationToken {
    let mut rng = rand::thread_rng();
    let mut token_bytes = [0u8; RANDOM_BYTES_LEN];
    rng.fill(&mut token_bytes[..]);

    ConfirmationToken::new(URL_SAFE_NO_PAD.encode(token_bytes))
}
