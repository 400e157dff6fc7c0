/// Single-purpose signed tokens for email verification and password reset
///
/// Tokens are HS256 JWTs mailed to the account owner. Each token is bound to
/// one account, one email address and one [`TokenPurpose`], so a reset token
/// can never verify an email and vice versa.
///
/// Expiry is checked against the caller-supplied `now` rather than the wall
/// clock, so the rule follows the engine's [`Clock`](crate::clock::Clock).
///
/// # Example
///
/// ```
/// use brandai_shared::auth::verification::{create_token, validate_token, TokenClaims, TokenPurpose};
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let now = Utc::now();
/// let account_id = Uuid::new_v4();
///
/// let claims = TokenClaims::new(account_id, "ada@example.com", TokenPurpose::EmailVerification, now, Duration::hours(24));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret, TokenPurpose::EmailVerification, now)?;
/// assert_eq!(validated.sub, account_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim on every token
const ISSUER: &str = "brandai";

/// Error type for verification token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer or format check failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was minted for another purpose
    #[error("Token purpose mismatch: expected {expected}, got {actual}")]
    WrongPurpose {
        expected: &'static str,
        actual: &'static str,
    },
}

/// What a token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Confirms ownership of the account email
    EmailVerification,

    /// Authorizes setting a new password
    PasswordReset,
}

impl TokenPurpose {
    /// Gets purpose as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Token claims
///
/// # Standard Claims
///
/// - `sub`: Account ID
/// - `iss`: Always "brandai"
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Custom Claims
///
/// - `email`: Address the token was mailed to
/// - `purpose`: Verification or reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub email: String,
    pub purpose: TokenPurpose,
}

impl TokenClaims {
    /// Creates claims valid from `now` for `ttl`
    pub fn new(
        account_id: Uuid,
        email: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        TokenClaims {
            sub: account_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            email: email.to_string(),
            purpose,
        }
    }

    /// Checks if token has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `TokenError::CreateError` if encoding fails
pub fn create_token(claims: &TokenClaims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, the issuer, the purpose, and that `now` lies in
/// `[nbf, exp)`.
///
/// # Errors
///
/// - `TokenError::Invalid` for bad signatures, issuers or formats
/// - `TokenError::Expired` when `now >= exp` or `now < nbf`
/// - `TokenError::WrongPurpose` when minted for another purpose
pub fn validate_token(
    token: &str,
    secret: &str,
    purpose: TokenPurpose,
    now: DateTime<Utc>,
) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    // Time checks use the injected clock below
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map_err(|e| TokenError::Invalid(format!("Token validation failed: {}", e)))?
        .claims;

    if claims.is_expired(now) || now.timestamp() < claims.nbf {
        return Err(TokenError::Expired);
    }

    if claims.purpose != purpose {
        return Err(TokenError::WrongPurpose {
            expected: purpose.as_str(),
            actual: claims.purpose.as_str(),
        });
    }

    Ok(claims)
}
