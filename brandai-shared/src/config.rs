/// Engine configuration
///
/// Loads the entitlement engine's tunables from environment variables and
/// provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `BRANDAI_TOKEN_SECRET`: HS256 secret for verification/reset tokens (required, ≥ 32 chars)
/// - `BRANDAI_TRIAL_DAYS`: Trial length in days (default: 14)
/// - `BRANDAI_SESSION_TTL_HOURS`: Session TTL without "remember me" (default: 24)
/// - `BRANDAI_REMEMBER_ME_TTL_DAYS`: Session TTL with "remember me" (default: 30)
/// - `BRANDAI_VERIFICATION_TTL_HOURS`: Email verification token TTL (default: 24)
/// - `BRANDAI_RESET_TTL_MINUTES`: Password reset token TTL (default: 60)
/// - `BRANDAI_COLLABORATOR_TIMEOUT_SECS`: Deadline for payment/generation/mail calls (default: 30)
/// - `BRANDAI_ARGON2_MEMORY_KIB`, `BRANDAI_ARGON2_ITERATIONS`, `BRANDAI_ARGON2_PARALLELISM`:
///   credential hashing cost (defaults: 65536, 3, 4)
///
/// # Example
///
/// ```no_run
/// use brandai_shared::config::EngineConfig;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = EngineConfig::from_env()?;
/// println!("Trials last {} days", config.trial_duration.num_days());
/// # Ok(())
/// # }
/// ```

use crate::auth::password::PasswordParams;
use chrono::Duration;
use std::env;
use std::str::FromStr;

/// Minimum length of the token signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Secret for signing verification and reset tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    pub token_secret: String,

    /// Length of the signup trial
    pub trial_duration: Duration,

    /// Session lifetimes
    pub sessions: SessionConfig,

    /// Email verification token lifetime
    pub verification_ttl: Duration,

    /// Password reset token lifetime
    pub reset_ttl: Duration,

    /// Deadline applied to every external collaborator call
    pub collaborator_timeout: std::time::Duration,

    /// Credential hashing cost
    pub password: PasswordParams,
}

/// Session lifetimes
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// TTL for ordinary sessions
    pub short_ttl: Duration,

    /// TTL for "remember me" sessions
    pub long_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            short_ttl: Duration::hours(24),
            long_ttl: Duration::days(30),
        }
    }
}

impl SessionConfig {
    /// TTL for a session
    pub fn ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.long_ttl
        } else {
            self.short_ttl
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default tunables
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LENGTH`]
    pub fn new(token_secret: impl Into<String>) -> anyhow::Result<Self> {
        let token_secret = token_secret.into();
        if token_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("token secret must be at least {} characters long", MIN_SECRET_LENGTH);
        }

        Ok(Self {
            token_secret,
            trial_duration: Duration::days(14),
            sessions: SessionConfig::default(),
            verification_ttl: Duration::hours(24),
            reset_ttl: Duration::minutes(60),
            collaborator_timeout: std::time::Duration::from_secs(30),
            password: PasswordParams::default(),
        })
    }

    /// Replaces the credential hashing cost
    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password = params;
        self
    }

    /// Replaces the collaborator deadline
    pub fn with_collaborator_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `BRANDAI_TOKEN_SECRET` is missing or too short
    /// - A numeric variable is present but does not parse
    /// - A duration variable is negative or out of range
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let token_secret = env::var("BRANDAI_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("BRANDAI_TOKEN_SECRET environment variable is required"))?;

        let mut config = Self::new(token_secret)?;

        config.trial_duration = env_duration("BRANDAI_TRIAL_DAYS", 14, Duration::try_days)?;
        config.sessions = SessionConfig {
            short_ttl: env_duration("BRANDAI_SESSION_TTL_HOURS", 24, Duration::try_hours)?,
            long_ttl: env_duration("BRANDAI_REMEMBER_ME_TTL_DAYS", 30, Duration::try_days)?,
        };
        config.verification_ttl =
            env_duration("BRANDAI_VERIFICATION_TTL_HOURS", 24, Duration::try_hours)?;
        config.reset_ttl = env_duration("BRANDAI_RESET_TTL_MINUTES", 60, Duration::try_minutes)?;
        config.collaborator_timeout =
            std::time::Duration::from_secs(env_or("BRANDAI_COLLABORATOR_TIMEOUT_SECS", 30)?);

        let defaults = PasswordParams::default();
        config.password = PasswordParams {
            memory_kib: env_or("BRANDAI_ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("BRANDAI_ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("BRANDAI_ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        Ok(config)
    }
}

/// Reads and parses an optional variable, falling back to `default` when unset
fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Reads a whole number of `unit`s, falling back to `default` when unset
fn env_duration(
    name: &str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration> {
    duration_from(name, env_or(name, default)?, unit)
}

fn duration_from(
    name: &str,
    value: i64,
    unit: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration> {
    if value < 0 {
        anyhow::bail!("{} must not be negative, got {}", name, value);
    }

    match unit(value) {
        Some(duration) => Ok(duration),
        None => anyhow::bail!("{} is out of range: {}", name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = EngineConfig::new("test-secret-key-at-least-32-bytes-long").unwrap();
        assert_eq!(config.trial_duration, Duration::days(14));
        assert_eq!(config.sessions.short_ttl, Duration::hours(24));
        assert_eq!(config.sessions.long_ttl, Duration::days(30));
        assert_eq!(config.verification_ttl, Duration::hours(24));
        assert_eq!(config.reset_ttl, Duration::minutes(60));
        assert_eq!(config.collaborator_timeout, std::time::Duration::from_secs(30));
        assert_eq!(config.password, PasswordParams::default());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = EngineConfig::new("too-short").unwrap_err();
        assert!(err.to_string().contains("at least 32 characters"));
    }

    #[test]
    fn test_session_ttl_selection() {
        let sessions = SessionConfig::default();
        assert_eq!(sessions.ttl(false), Duration::hours(24));
        assert_eq!(sessions.ttl(true), Duration::days(30));
    }

    #[test]
    fn test_env_or_default_when_unset() {
        let value: i64 = env_or("BRANDAI_TEST_SURELY_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_duration_from_accepts_whole_units() {
        assert_eq!(
            duration_from("BRANDAI_TRIAL_DAYS", 7, Duration::try_days).unwrap(),
            Duration::days(7)
        );
        assert_eq!(
            duration_from("BRANDAI_RESET_TTL_MINUTES", 0, Duration::try_minutes).unwrap(),
            Duration::zero()
        );
    }

    #[test]
    fn test_duration_from_rejects_negative() {
        let err = duration_from("BRANDAI_TRIAL_DAYS", -1, Duration::try_days).unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn test_duration_from_rejects_overflow() {
        let err = duration_from("BRANDAI_TRIAL_DAYS", i64::MAX, Duration::try_days).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
