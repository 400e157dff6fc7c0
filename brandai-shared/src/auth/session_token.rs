/// Session bearer tokens
///
/// # Security
///
/// - **Format**: `bai_s_{64 hex chars}` (prefix + 32 random bytes)
/// - **Entropy**: 256 bits from the thread-local CSPRNG
/// - **Storage**: only the SHA-256 digest is kept by the session store, so a
///   leaked store snapshot cannot be replayed as bearer credentials
///
/// # Example
///
/// ```
/// use brandai_shared::auth::session_token::{
///     generate_session_token, hash_session_token, validate_session_token_format,
/// };
///
/// let (token, digest) = generate_session_token();
/// assert!(token.starts_with("bai_s_"));
/// assert!(validate_session_token_format(&token));
/// assert_eq!(hash_session_token(&token), digest);
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token
const TOKEN_RANDOM_BYTES: usize = 32;

/// Session token prefix
const TOKEN_PREFIX: &str = "bai_s_";

/// Total length of a session token (prefix + hex body)
pub const SESSION_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_BYTES * 2;

/// Generates a new session token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hex_digest)
pub fn generate_session_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = format!("{}{}", TOKEN_PREFIX, hex::encode(bytes));
    let digest = hash_session_token(&token);

    (token, digest)
}

/// Hashes a session token using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 digest (64 characters)
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validates session token format
///
/// Cheap pre-check run before any store lookup; a malformed token can never
/// resolve.
pub fn validate_session_token_format(token: &str) -> bool {
    if token.len() != SESSION_TOKEN_LENGTH {
        return false;
    }

    match token.strip_prefix(TOKEN_PREFIX) {
        Some(body) => body.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
