/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing and strength validation
/// - [`session_token`]: Random bearer tokens stored by SHA-256 digest
/// - [`verification`]: Signed single-purpose tokens for email verification
///   and password reset
///
/// # Example
///
/// ```
/// use brandai_shared::auth::password::{hash_password, verify_password, PasswordParams};
/// use brandai_shared::auth::session_token::generate_session_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret123", &PasswordParams::minimal())?;
/// assert!(verify_password("Secret123", &hash)?);
///
/// let (token, digest) = generate_session_token();
/// assert_ne!(token, digest);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod session_token;
pub mod verification;
