#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Engine construction with a manual clock and cheap Argon2 parameters
/// - Signup helpers
/// - Collaborator doubles (recording gateway, failing and stalled services)

use async_trait::async_trait;
use brandai_shared::auth::password::PasswordParams;
use brandai_shared::clock::{Clock, ManualClock};
use brandai_shared::collaborators::{
    CollaboratorError, CollaboratorResult, ContentGenerator, DevPaymentGateway, EchoGenerator,
    EmailKind, GeneratedAsset, GenerationRequest, OutboxMailer, PaymentGateway, PaymentOutcome,
    PaymentRequest,
};
use brandai_shared::config::EngineConfig;
use brandai_shared::engine::{AuthOutcome, EntitlementEngine};
use brandai_shared::models::account::{LoginCredentials, SignupData};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Deadline applied to collaborator calls in tests
pub const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

pub const PASSWORD: &str = "Secret123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub engine: Arc<EntitlementEngine>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<OutboxMailer>,
    pub payments: Arc<RecordingGateway>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

impl TestContext {
    /// Engine with the dev generator
    pub fn new() -> Self {
        Self::with_generator(Arc::new(EchoGenerator::new()))
    }

    /// Engine with a custom generator
    pub fn with_generator(generator: Arc<dyn ContentGenerator>) -> Self {
        Self::build(generator, Arc::new(RecordingGateway::new(DevPaymentGateway::new())))
    }

    /// Engine with a custom payment gateway behind the recorder
    pub fn with_gateway(gateway: impl PaymentGateway + 'static) -> Self {
        Self::build(Arc::new(EchoGenerator::new()), Arc::new(RecordingGateway::new(gateway)))
    }

    fn build(generator: Arc<dyn ContentGenerator>, payments: Arc<RecordingGateway>) -> Self {
        let config = EngineConfig::new(SECRET)
            .unwrap()
            .with_password_params(PasswordParams::minimal())
            .with_collaborator_timeout(COLLABORATOR_TIMEOUT);

        let clock = Arc::new(ManualClock::new(start_time()));
        let mailer = Arc::new(OutboxMailer::new());

        let engine = EntitlementEngine::builder(config)
            .clock(clock.clone())
            .mailer(mailer.clone())
            .payments(payments.clone())
            .generator(generator)
            .build();

        TestContext {
            engine: Arc::new(engine),
            clock,
            mailer,
            payments,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Signs up with the default password
    pub async fn signup(&self, email: &str) -> AuthOutcome {
        self.engine
            .signup(signup_data(email))
            .await
            .expect("signup should succeed")
    }

    /// Logs in with the default password
    pub async fn login(&self, email: &str, remember_me: bool) -> AuthOutcome {
        self.engine
            .login(LoginCredentials {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                remember_me,
            })
            .await
            .expect("login should succeed")
    }

    /// Most recent verification token mailed out
    pub fn verification_token(&self) -> String {
        self.mailer
            .last_token(EmailKind::Verification)
            .expect("a verification email should have been sent")
    }

    /// Most recent reset token mailed out
    pub fn reset_token(&self) -> String {
        self.mailer
            .last_token(EmailKind::PasswordReset)
            .expect("a reset email should have been sent")
    }
}

pub fn signup_data(email: &str) -> SignupData {
    SignupData {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        accepted_terms: true,
        ..Default::default()
    }
}

/// Gateway wrapper that records every confirmed request
pub struct RecordingGateway {
    inner: Box<dyn PaymentGateway>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl RecordingGateway {
    pub fn new(inner: impl PaymentGateway + 'static) -> Self {
        RecordingGateway {
            inner: Box::new(inner),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    async fn confirm(&self, request: &PaymentRequest) -> CollaboratorResult<PaymentOutcome> {
        self.requests.lock().push(request.clone());
        self.inner.confirm(request).await
    }
}

/// Gateway that never answers
pub struct StalledGateway;

#[async_trait]
impl PaymentGateway for StalledGateway {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn confirm(&self, _request: &PaymentRequest) -> CollaboratorResult<PaymentOutcome> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(PaymentOutcome::approved())
    }
}

/// Gateway that approves after a fixed delay
pub struct SlowGateway {
    pub delay: Duration,
}

#[async_trait]
impl PaymentGateway for SlowGateway {
    fn name(&self) -> &str {
        "slow"
    }

    async fn confirm(&self, _request: &PaymentRequest) -> CollaboratorResult<PaymentOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(PaymentOutcome::approved())
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl ContentGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> CollaboratorResult<GeneratedAsset> {
        Err(CollaboratorError::Unavailable("upstream returned 503".to_string()))
    }
}

/// Generator that never answers
pub struct StalledGenerator;

#[async_trait]
impl ContentGenerator for StalledGenerator {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> CollaboratorResult<GeneratedAsset> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(GeneratedAsset {
            url: "https://cdn.brandai.dev/never.png".to_string(),
        })
    }
}
