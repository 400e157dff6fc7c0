/// Account model and input types
///
/// An account is the identity unit: credentials, profile, marketing
/// attribution, verification state and the current plan. Accounts are owned by
/// [`AccountDirectory`](crate::directory::AccountDirectory) and are never
/// physically deleted; `disabled_at` marks a soft-disabled account.
///
/// # Example
///
/// ```
/// use brandai_shared::models::account::SignupData;
/// use validator::Validate;
///
/// let signup = SignupData {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password: "Secret123".to_string(),
///     accepted_terms: true,
///     ..Default::default()
/// };
/// assert!(signup.validate().is_ok());
/// ```

use crate::models::plan::{BillingCycle, PlanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account identifier
pub type AccountId = Uuid;

/// Account record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: AccountId,

    /// Email address as entered at signup
    pub email: String,

    /// Argon2id credential hash (never serialized)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Profile fields
    pub profile: Profile,

    /// Acquisition and consent data
    pub marketing: Marketing,

    /// Notification preferences
    pub preferences: Preferences,

    /// Whether the email address has been verified (false → true only)
    pub email_verified: bool,

    /// Current plan
    pub plan_id: PlanId,

    /// Billing cycle for the current plan
    pub billing_cycle: BillingCycle,

    /// Start of the trial, if one was granted
    pub trial_started_at: Option<DateTime<Utc>>,

    /// End of the trial; cleared only by an upgrade
    pub trial_ends_at: Option<DateTime<Utc>>,

    /// Creation time, also the anchor of every quota period
    pub created_at: DateTime<Utc>,

    /// Last mutation time
    pub updated_at: DateTime<Utc>,

    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,

    /// Number of successful logins
    pub login_count: u64,

    /// Soft-disable marker
    pub disabled_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Whether the account has been soft-disabled
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    /// Whether the account is on its trial and the trial has elapsed
    pub fn trial_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.plan_id == PlanId::Trial && self.trial_ends_at.is_some_and(|ends| now >= ends)
    }

    /// Anchor for quota period windows
    pub fn billing_anchor(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Profile fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
}

/// Acquisition and consent data captured at signup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marketing {
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub referral_code: Option<String>,
    pub accepted_marketing: bool,
    pub tags: Vec<String>,
}

/// Notification preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub notifications: bool,
    pub newsletter: bool,
    pub product_updates: bool,
}

/// Signup request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password (strength checked separately)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Company must be at most 100 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 100, message = "Job title must be at most 100 characters"))]
    pub job_title: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    pub accepted_terms: bool,

    #[serde(default)]
    pub accepted_marketing: bool,

    pub referral_code: Option<String>,
    pub source: Option<String>,
    pub campaign: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginCredentials {
    /// Credentials without "remember me"
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        LoginCredentials {
            email: email.into(),
            password: password.into(),
            remember_me: false,
        }
    }
}

/// Profile update; only `Some` fields are applied
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "First name cannot be empty"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,

    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Company must be at most 100 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 100, message = "Job title must be at most 100 characters"))]
    pub job_title: Option<String>,

    pub newsletter: Option<bool>,
    pub notifications: Option<bool>,
    pub product_updates: Option<bool>,
}

/// Normalizes an email for uniqueness checks and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_signup() -> SignupData {
        SignupData {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Secret123".to_string(),
            accepted_terms: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_signup_validation_ok() {
        assert!(valid_signup().validate().is_ok());
    }

    #[test]
    fn test_signup_validation_bad_email() {
        let mut signup = valid_signup();
        signup.email = "not-an-email".to_string();
        let errors = signup.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_signup_validation_missing_name() {
        let mut signup = valid_signup();
        signup.first_name = String::new();
        assert!(signup.validate().is_err());
    }

    #[test]
    fn test_signup_deserializes_camel_case() {
        let json = serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "password": "Secret123",
            "acceptedTerms": true,
            "acceptedMarketing": true,
            "campaign": "main-signup"
        });
        let signup: SignupData = serde_json::from_value(json).unwrap();
        assert!(signup.accepted_terms);
        assert!(signup.accepted_marketing);
        assert_eq!(signup.campaign.as_deref(), Some("main-signup"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }
}
