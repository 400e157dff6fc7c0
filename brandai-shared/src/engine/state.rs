/// Authentication state of an account-session pair
///
/// ```text
/// Anonymous ──login/signup──▶ Authenticating ──ok──▶ Authenticated { verified: false }
///     ▲                            │                        │ verify_email
///     │                           fail                      ▼
///     └──────────── logout ◀───────┴────────── Authenticated { verified: true }
/// ```
///
/// `Authenticating` only exists while credentials are being checked; engine
/// operations either complete the transition or fall back to `Anonymous`.

use crate::models::account::Account;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AuthState {
    /// No valid session
    Anonymous,

    /// Credentials are being checked
    Authenticating,

    /// Valid session
    Authenticated { verified: bool },
}

impl AuthState {
    /// State of a valid session held by `account`
    pub fn for_account(account: &Account) -> Self {
        AuthState::Authenticated {
            verified: account.email_verified,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, AuthState::Authenticated { verified: true })
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Anonymous => write!(f, "anonymous"),
            AuthState::Authenticating => write!(f, "authenticating"),
            AuthState::Authenticated { verified: false } => write!(f, "authenticated(unverified)"),
            AuthState::Authenticated { verified: true } => write!(f, "authenticated(verified)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_state_predicates() {
        assert!(!AuthState::Anonymous.is_authenticated());
        assert!(!AuthState::Authenticating.is_authenticated());
        assert!(AuthState::Authenticated { verified: false }.is_authenticated());
        assert!(!AuthState::Authenticated { verified: false }.is_verified());
        assert!(AuthState::Authenticated { verified: true }.is_verified());
    }

    #[test]
    fn test_auth_state_display_and_serialization() {
        assert_eq!(
            AuthState::Authenticated { verified: true }.to_string(),
            "authenticated(verified)"
        );

        let json = serde_json::to_value(AuthState::Authenticated { verified: false }).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "authenticated", "verified": false }));

        let json = serde_json::to_value(AuthState::Anonymous).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "anonymous" }));
    }
}
