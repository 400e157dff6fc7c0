/// External collaborators
///
/// The engine talks to three outside systems, each behind an async trait so
/// that production clients, development stand-ins and test doubles are
/// interchangeable:
///
/// - [`PaymentGateway`]: confirms a charge before a plan upgrade
/// - [`ContentGenerator`]: produces an asset for a generation request
/// - [`Mailer`]: delivers verification and password-reset emails
///
/// Calls to collaborators are the engine's only suspension points. The engine
/// bounds each one with its configured deadline and never holds a lock across
/// them.

pub mod dev;

pub use dev::{DevPaymentGateway, EchoGenerator, OutboxMailer};

use crate::models::account::AccountId;
use crate::models::plan::{BillingCycle, PlanId, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for collaborator calls
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or answered garbage
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Charge to confirm before switching plans
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub account_id: AccountId,
    pub plan_id: PlanId,
    pub cycle: BillingCycle,

    /// Price in whole USD for the chosen cycle
    pub amount: u32,

    /// Opaque payment method reference supplied by the caller
    pub payment_method: String,
}

/// Payment processor answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentOutcome {
    /// Charge went through
    pub fn approved() -> Self {
        PaymentOutcome {
            success: true,
            error: None,
        }
    }

    /// Charge was declined
    pub fn declined(reason: impl Into<String>) -> Self {
        PaymentOutcome {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Gateway name, for logs
    fn name(&self) -> &str;

    /// Confirms a charge
    ///
    /// A declined charge is an `Ok` outcome with `success == false`; `Err` is
    /// reserved for transport failures.
    async fn confirm(&self, request: &PaymentRequest) -> CollaboratorResult<PaymentOutcome>;
}

/// Generation request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub account_id: AccountId,
    pub kind: ResourceKind,
    pub prompt: String,
}

/// Generated asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAsset {
    /// Where the asset can be fetched
    pub url: String,
}

/// Asset generator
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generator name, for logs
    fn name(&self) -> &str;

    /// Generates one asset
    async fn generate(&self, request: &GenerationRequest) -> CollaboratorResult<GeneratedAsset>;
}

/// Transactional email kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// Outbound email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub to: String,
    pub kind: EmailKind,
    pub subject: String,
    pub body: String,

    /// Signed token embedded in the email's link
    pub token: String,
}

/// Email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email
    async fn send(&self, email: &OutboundEmail) -> CollaboratorResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_outcome_serialization() {
        let json = serde_json::to_value(PaymentOutcome::approved()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));

        let json = serde_json::to_value(PaymentOutcome::declined("card expired")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "card expired");
    }

    #[test]
    fn test_collaborator_error_display() {
        let err = CollaboratorError::Rejected("prompt too long".to_string());
        assert_eq!(err.to_string(), "Request rejected: prompt too long");
    }
}
