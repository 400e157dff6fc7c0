/// Engine error type
///
/// Every component error converts 1:1 into [`EngineError`], the only error
/// the [`EntitlementEngine`](crate::engine::EntitlementEngine) returns. Callers
/// that render results use [`EngineError::user_message`] so internal details
/// (account IDs, hashing failures) never reach end users.
///
/// # Error Categories
///
/// - **Caller mistakes**: `Validation`, `InvalidCredentials`, `EmailAlreadyExists`
/// - **Re-authentication needed**: `SessionNotFound`, `SessionExpired`
/// - **Business rules**: `QuotaExceeded`, `PaymentFailed`, `VerificationFailed`
/// - **Collaborators**: `CollaboratorTimeout`, `GenerationFailed`, `MailFailed`
/// - **Faults**: `AccountNotFound`, `PlanNotFound`, `Internal`

use crate::auth::password::PasswordError;
use crate::auth::verification::TokenError;
use crate::catalog::CatalogError;
use crate::directory::DirectoryError;
use crate::ledger::QuotaError;
use crate::models::account::AccountId;
use crate::sessions::SessionError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Error returned by engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Input rejected by a validation rule
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// Unknown email, wrong password or disabled account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already exists")]
    EmailAlreadyExists,

    /// Session refers to an account that no longer resolves
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Unknown plan identifier
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Unknown or revoked session token
    #[error("Session not found")]
    SessionNotFound,

    /// Session TTL has passed
    #[error("Session expired")]
    SessionExpired,

    /// Plan limit reached
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(QuotaError),

    /// Payment processor declined or failed
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Verification or reset token rejected
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A collaborator missed its deadline
    #[error("{0} timed out")]
    CollaboratorTimeout(&'static str),

    /// Generator failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Mailer failed
    #[error("Mail delivery failed: {0}")]
    MailFailed(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation_error",
            EngineError::InvalidCredentials => "invalid_credentials",
            EngineError::EmailAlreadyExists => "email_already_exists",
            EngineError::AccountNotFound(_) => "account_not_found",
            EngineError::PlanNotFound(_) => "plan_not_found",
            EngineError::SessionNotFound => "session_not_found",
            EngineError::SessionExpired => "session_expired",
            EngineError::QuotaExceeded(_) => "quota_exceeded",
            EngineError::PaymentFailed(_) => "payment_failed",
            EngineError::VerificationFailed(_) => "verification_failed",
            EngineError::CollaboratorTimeout(_) => "collaborator_timeout",
            EngineError::GenerationFailed(_) => "generation_failed",
            EngineError::MailFailed(_) => "mail_failed",
            EngineError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error indicates a broken invariant rather than bad input
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            EngineError::AccountNotFound(_) | EngineError::PlanNotFound(_) | EngineError::Internal(_)
        )
    }

    /// Whether the caller has to log in again
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, EngineError::SessionNotFound | EngineError::SessionExpired)
    }

    /// Message safe to show to end users
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation { message, .. } => message.clone(),
            EngineError::InvalidCredentials => "Invalid email or password".to_string(),
            EngineError::EmailAlreadyExists => {
                "An account with this email already exists".to_string()
            }
            EngineError::SessionNotFound | EngineError::SessionExpired => {
                "Your session has ended. Please log in again".to_string()
            }
            EngineError::QuotaExceeded(QuotaError::LimitExceeded { kind, limit, .. }) => format!(
                "You have used all {} {} included in your plan this period",
                limit,
                kind.label().to_lowercase()
            ),
            EngineError::PaymentFailed(reason) => format!("Payment failed: {}", reason),
            EngineError::VerificationFailed(_) => {
                "This link is invalid or has expired".to_string()
            }
            EngineError::CollaboratorTimeout(_) => {
                "The request took too long. Please try again".to_string()
            }
            EngineError::GenerationFailed(_) => "Generation failed. Please try again".to_string(),
            EngineError::MailFailed(_) => {
                "We could not send the email. Please try again later".to_string()
            }
            EngineError::AccountNotFound(_)
            | EngineError::PlanNotFound(_)
            | EngineError::Internal(_) => "Something went wrong. Please try again".to_string(),
        }
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation { field, message } => {
                EngineError::Validation { field, message }
            }
            DirectoryError::EmailAlreadyExists => EngineError::EmailAlreadyExists,
            DirectoryError::InvalidCredentials => EngineError::InvalidCredentials,
            DirectoryError::AccountNotFound(id) => EngineError::AccountNotFound(id),
            DirectoryError::AccountDisabled(_) => EngineError::SessionNotFound,
            DirectoryError::Password(e) => e.into(),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound => EngineError::SessionNotFound,
            SessionError::SessionExpired => EngineError::SessionExpired,
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::PlanNotFound(id) => EngineError::PlanNotFound(id),
            other => EngineError::Internal(format!("Plan catalog: {}", other)),
        }
    }
}

impl From<QuotaError> for EngineError {
    fn from(err: QuotaError) -> Self {
        EngineError::QuotaExceeded(err)
    }
}

impl From<TokenError> for EngineError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::CreateError(msg) => EngineError::Internal(msg),
            other => EngineError::VerificationFailed(other.to_string()),
        }
    }
}

impl From<PasswordError> for EngineError {
    fn from(err: PasswordError) -> Self {
        EngineError::Internal(format!("Password operation failed: {}", err))
    }
}
