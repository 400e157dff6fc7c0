/// Development collaborators
///
/// Deterministic stand-ins used by local tooling and tests:
///
/// - [`DevPaymentGateway`]: approves every charge except payment methods
///   starting with `decline`
/// - [`EchoGenerator`]: returns a fake CDN URL derived from the request
/// - [`OutboxMailer`]: logs each email and keeps it in memory for inspection
///
/// # Example
///
/// ```
/// use brandai_shared::collaborators::{EmailKind, Mailer, OutboundEmail, OutboxMailer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = OutboxMailer::new();
/// mailer
///     .send(&OutboundEmail {
///         to: "ada@example.com".into(),
///         kind: EmailKind::Verification,
///         subject: "Verify your email".into(),
///         body: "...".into(),
///         token: "abc".into(),
///     })
///     .await?;
///
/// assert_eq!(mailer.last_token(EmailKind::Verification).as_deref(), Some("abc"));
/// # Ok(())
/// # }
/// ```

use super::{
    CollaboratorError, CollaboratorResult, ContentGenerator, EmailKind, GeneratedAsset,
    GenerationRequest, Mailer, OutboundEmail, PaymentGateway, PaymentOutcome, PaymentRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

/// Payment methods with this prefix are declined
const DECLINE_PREFIX: &str = "decline";

/// Approve-everything payment gateway
#[derive(Debug, Default, Clone)]
pub struct DevPaymentGateway;

impl DevPaymentGateway {
    pub fn new() -> Self {
        DevPaymentGateway
    }
}

#[async_trait]
impl PaymentGateway for DevPaymentGateway {
    fn name(&self) -> &str {
        "dev"
    }

    async fn confirm(&self, request: &PaymentRequest) -> CollaboratorResult<PaymentOutcome> {
        if request.payment_method.trim().is_empty() {
            return Ok(PaymentOutcome::declined("Payment method is required"));
        }

        if request.payment_method.starts_with(DECLINE_PREFIX) {
            return Ok(PaymentOutcome::declined("Card declined"));
        }

        tracing::debug!(
            account_id = %request.account_id,
            plan = %request.plan_id,
            amount = request.amount,
            "Dev payment approved"
        );

        Ok(PaymentOutcome::approved())
    }
}

/// Generator that fabricates asset URLs
#[derive(Debug, Clone)]
pub struct EchoGenerator {
    base_url: String,
}

impl Default for EchoGenerator {
    fn default() -> Self {
        EchoGenerator {
            base_url: "https://cdn.brandai.dev".to_string(),
        }
    }
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> CollaboratorResult<GeneratedAsset> {
        if request.prompt.trim().is_empty() {
            return Err(CollaboratorError::Rejected("Prompt is empty".to_string()));
        }

        Ok(GeneratedAsset {
            url: format!("{}/{}/{}.png", self.base_url, request.kind, Uuid::new_v4()),
        })
    }
}

/// Mailer that records instead of delivering
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every email sent so far
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    /// Token of the most recent email of a kind
    pub fn last_token(&self, kind: EmailKind) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|email| email.kind == kind)
            .map(|email| email.token.clone())
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutboundEmail) -> CollaboratorResult<()> {
        tracing::info!(to = %email.to, kind = ?email.kind, subject = %email.subject, "Email queued");
        self.sent.lock().push(email.clone());
        Ok(())
    }
}
