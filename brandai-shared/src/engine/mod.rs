/// Entitlement engine
///
/// Orchestrates the account lifecycle (signup, login, email verification,
/// password reset, plan changes) and gates resource consumption, by composing
/// the [`PlanCatalog`], [`AccountDirectory`], [`SessionStore`] and
/// [`UsageLedger`] with the external [collaborators](crate::collaborators).
///
/// # Sessions
///
/// Every operation on behalf of a user takes its bearer token explicitly.
/// The token is resolved on each call; there is no ambient "current user".
///
/// # Suspension Points
///
/// Only collaborator calls (payment, generation, mail) await. Each is bounded
/// by `collaborator_timeout`, and no component lock is held across them.
/// State changes that depend on a collaborator happen after it answers, so
/// dropping an operation mid-flight never leaves a half-applied transition.
/// [`EntitlementEngine::generate`] charges quota before calling the generator
/// and refunds it through a drop guard if the call fails, times out or is
/// cancelled.
///
/// # Trials
///
/// Trial expiry is applied lazily: whenever a session resolves to an account
/// whose trial has elapsed, the account is moved to the free plan before the
/// operation proceeds. The maintenance worker applies the same rule in bulk.
///
/// # Example
///
/// ```
/// use brandai_shared::auth::password::PasswordParams;
/// use brandai_shared::config::EngineConfig;
/// use brandai_shared::engine::EntitlementEngine;
/// use brandai_shared::models::account::SignupData;
/// use brandai_shared::models::plan::ResourceKind;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = EngineConfig::new("a-secret-that-is-at-least-32-bytes-long")?
///     .with_password_params(PasswordParams::minimal());
/// let engine = EntitlementEngine::builder(config).build();
///
/// let outcome = engine
///     .signup(SignupData {
///         first_name: "Ada".into(),
///         last_name: "Lovelace".into(),
///         email: "ada@example.com".into(),
///         password: "Secret123".into(),
///         accepted_terms: true,
///         ..Default::default()
///     })
///     .await?;
/// assert!(outcome.requires_verification);
///
/// let consumed = engine
///     .consume_resource(&outcome.token, ResourceKind::LogoGeneration)
///     .await?;
/// assert_eq!(consumed.remaining, Some(99));
/// # Ok(())
/// # }
/// ```

pub mod results;
pub mod state;

pub use results::{
    AuthOutcome, AuthResult, ConsumeOutcome, ConsumeResult, MaintenanceReport, OperationResult,
    UsageReport,
};
pub use state::AuthState;

use crate::auth::verification::{create_token, validate_token, TokenClaims, TokenPurpose};
use crate::catalog::PlanCatalog;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    CollaboratorResult, ContentGenerator, DevPaymentGateway, EchoGenerator, EmailKind,
    GeneratedAsset, GenerationRequest, Mailer, OutboundEmail, OutboxMailer, PaymentGateway,
    PaymentRequest,
};
use crate::config::EngineConfig;
use crate::directory::AccountDirectory;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{Entitlement, UsageLedger, UsageReceipt};
use crate::models::account::{
    normalize_email, Account, LoginCredentials, ProfileUpdate, SignupData,
};
use crate::models::plan::{BillingCycle, Feature, PlanView, ResourceKind};
use crate::models::usage::billing_period;
use crate::sessions::SessionStore;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;

/// Builder for [`EntitlementEngine`]
///
/// Unset parts default to the built-in catalog, the system clock and the
/// development collaborators.
pub struct EngineBuilder {
    config: EngineConfig,
    catalog: Option<Arc<PlanCatalog>>,
    clock: Option<Arc<dyn Clock>>,
    payments: Option<Arc<dyn PaymentGateway>>,
    generator: Option<Arc<dyn ContentGenerator>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl EngineBuilder {
    pub fn catalog(mut self, catalog: Arc<PlanCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = Some(payments);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn build(self) -> EntitlementEngine {
        let config = self.config;
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(PlanCatalog::builtin()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let directory = Arc::new(AccountDirectory::new(
            catalog.clone(),
            clock.clone(),
            config.password,
            config.trial_duration,
        ));
        let sessions = Arc::new(SessionStore::new(clock.clone(), config.sessions));
        let ledger = Arc::new(UsageLedger::new(clock.clone()));

        EntitlementEngine {
            catalog,
            directory,
            sessions,
            ledger,
            clock,
            payments: self
                .payments
                .unwrap_or_else(|| Arc::new(DevPaymentGateway::new())),
            generator: self.generator.unwrap_or_else(|| Arc::new(EchoGenerator::new())),
            mailer: self.mailer.unwrap_or_else(|| Arc::new(OutboxMailer::new())),
            spent_tokens: DashMap::new(),
            config,
        }
    }
}

/// Account lifecycle and entitlement engine
pub struct EntitlementEngine {
    catalog: Arc<PlanCatalog>,
    directory: Arc<AccountDirectory>,
    sessions: Arc<SessionStore>,
    ledger: Arc<UsageLedger>,
    clock: Arc<dyn Clock>,
    payments: Arc<dyn PaymentGateway>,
    generator: Arc<dyn ContentGenerator>,
    mailer: Arc<dyn Mailer>,

    /// Digests of redeemed reset tokens, with their expiry
    spent_tokens: DashMap<String, DateTime<Utc>>,

    config: EngineConfig,
}

/// Refunds a consumption unless disarmed
struct RefundGuard {
    ledger: Arc<UsageLedger>,
    receipt: UsageReceipt,
    armed: bool,
}

impl RefundGuard {
    fn new(ledger: Arc<UsageLedger>, receipt: UsageReceipt) -> Self {
        RefundGuard {
            ledger,
            receipt,
            armed: true,
        }
    }

    fn disarm(mut self) -> UsageReceipt {
        self.armed = false;
        self.receipt.clone()
    }
}

impl Drop for RefundGuard {
    fn drop(&mut self) {
        if self.armed && self.ledger.refund(&self.receipt) {
            tracing::info!(
                account_id = %self.receipt.account_id,
                kind = %self.receipt.kind,
                "Charge refunded after unfinished generation"
            );
        }
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl EntitlementEngine {
    /// Starts building an engine
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            catalog: None,
            clock: None,
            payments: None,
            generator: None,
            mailer: None,
        }
    }

    pub fn catalog(&self) -> &Arc<PlanCatalog> {
        &self.catalog
    }

    pub fn directory(&self) -> &Arc<AccountDirectory> {
        &self.directory
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Logs in with email and password
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidCredentials` for any credential mismatch
    pub async fn login(&self, credentials: LoginCredentials) -> EngineResult<AuthOutcome> {
        tracing::debug!(state = %AuthState::Authenticating, "Checking credentials");

        let account = self
            .directory
            .authenticate(&credentials.email, &credentials.password)
            .map_err(|e| {
                tracing::info!(state = %AuthState::Anonymous, "Login rejected");
                EngineError::from(e)
            })?;

        let account = self.apply_trial_expiry(account)?;
        let issued = self.sessions.issue(account.id, credentials.remember_me);
        let account = self.directory.record_login(account.id).unwrap_or(account);

        let state = AuthState::for_account(&account);
        tracing::info!(account_id = %account.id, %state, "Logged in");

        Ok(AuthOutcome {
            requires_verification: !account.email_verified,
            token: issued.token,
            session: issued.session,
            state,
            account,
        })
    }

    /// Registers an account and logs it in
    ///
    /// The account starts on the default trial plan with an unverified email.
    pub async fn signup(&self, data: SignupData) -> EngineResult<AuthOutcome> {
        let account = self.directory.create_account(data)?;
        let issued = self.sessions.issue(account.id, false);

        let state = AuthState::for_account(&account);
        tracing::info!(account_id = %account.id, %state, "Signed up");

        Ok(AuthOutcome {
            requires_verification: true,
            token: issued.token,
            session: issued.session,
            state,
            account,
        })
    }

    /// Ends the current session only
    pub async fn logout(&self, token: &str) -> EngineResult<()> {
        if self.sessions.revoke(token) {
            tracing::debug!(state = %AuthState::Anonymous, "Logged out");
        }
        Ok(())
    }

    /// Authentication state of a token
    pub async fn session_state(&self, token: &str) -> AuthState {
        match self.authorize(token) {
            Ok(account) => AuthState::for_account(&account),
            Err(_) => AuthState::Anonymous,
        }
    }

    /// Account behind a token
    pub async fn account(&self, token: &str) -> EngineResult<Account> {
        self.authorize(token)
    }

    /// Mails a verification link to the session's account
    ///
    /// Succeeds without sending anything if the email is already verified.
    pub async fn send_verification_email(&self, token: &str) -> EngineResult<()> {
        let account = self.authorize(token)?;
        if account.email_verified {
            return Ok(());
        }

        let claims = TokenClaims::new(
            account.id,
            &account.email,
            TokenPurpose::EmailVerification,
            self.clock.now(),
            self.config.verification_ttl,
        );
        let verification_token = create_token(&claims, &self.config.token_secret)?;

        let email = OutboundEmail {
            to: account.email.clone(),
            kind: EmailKind::Verification,
            subject: "Verify your BrandAI email".to_string(),
            body: format!(
                "Hi {}, confirm your email address to unlock your BrandAI trial.",
                account.profile.first_name
            ),
            token: verification_token,
        };

        self.bounded("mailer", self.mailer.send(&email))
            .await?
            .map_err(|e| EngineError::MailFailed(e.to_string()))?;

        tracing::info!(account_id = %account.id, "Verification email sent");

        Ok(())
    }

    /// Verifies the session account's email with a mailed token
    ///
    /// Returns `true` if the account became verified, `false` if it already
    /// was. A rejected token changes nothing.
    pub async fn verify_email(&self, token: &str, verification_token: &str) -> EngineResult<bool> {
        let account = self.authorize(token)?;
        if account.email_verified {
            return Ok(false);
        }

        let claims = validate_token(
            verification_token,
            &self.config.token_secret,
            TokenPurpose::EmailVerification,
            self.clock.now(),
        )?;

        if claims.sub != account.id {
            return Err(EngineError::VerificationFailed(
                "Token was issued for another account".to_string(),
            ));
        }
        if normalize_email(&claims.email) != normalize_email(&account.email) {
            return Err(EngineError::VerificationFailed(
                "Token was issued for another address".to_string(),
            ));
        }

        let changed = self.directory.mark_verified(account.id)?;
        if changed {
            tracing::info!(account_id = %account.id, "Email verified");
        }

        Ok(changed)
    }

    /// Consumes one unit of a resource
    ///
    /// # Errors
    ///
    /// `EngineError::QuotaExceeded` when the plan limit for the period is used up
    pub async fn consume_resource(
        &self,
        token: &str,
        kind: ResourceKind,
    ) -> EngineResult<ConsumeOutcome> {
        let account = self.authorize(token)?;
        let receipt = self.charge(&account, kind, 1)?;

        Ok(ConsumeOutcome {
            kind,
            used: receipt.used,
            remaining: receipt.remaining,
        })
    }

    /// Generates an asset, charging one unit of `kind`
    ///
    /// The unit is refunded if the generator fails, misses its deadline, or
    /// the returned future is dropped before completion.
    pub async fn generate(
        &self,
        token: &str,
        kind: ResourceKind,
        prompt: &str,
    ) -> EngineResult<GeneratedAsset> {
        let account = self.authorize(token)?;

        if prompt.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "prompt".to_string(),
                message: "Prompt is required".to_string(),
            });
        }

        let guard = RefundGuard::new(self.ledger.clone(), self.charge(&account, kind, 1)?);

        let request = GenerationRequest {
            account_id: account.id,
            kind,
            prompt: prompt.trim().to_string(),
        };

        let asset = self
            .bounded("generator", self.generator.generate(&request))
            .await?
            .map_err(|e| {
                tracing::warn!(account_id = %account.id, generator = self.generator.name(), error = %e, "Generation failed");
                EngineError::GenerationFailed(e.to_string())
            })?;

        let receipt = guard.disarm();
        tracing::info!(account_id = %account.id, %kind, used = receipt.used, "Asset generated");

        Ok(asset)
    }

    /// Switches the session's account to another plan
    ///
    /// Payment is confirmed first and nothing changes if it fails. A target
    /// whose price for the chosen cycle is below what the account currently
    /// pays per cycle, or a free target, skips payment. Moving away from the
    /// trial ends it.
    pub async fn upgrade_plan(
        &self,
        token: &str,
        plan_id: &str,
        cycle: BillingCycle,
        payment_method: &str,
    ) -> EngineResult<Account> {
        let account = self.authorize(token)?;

        let target = self.catalog.get(plan_id).map_err(|e| {
            tracing::error!(account_id = %account.id, plan_id, "Unknown plan requested");
            EngineError::from(e)
        })?;

        if target.is_trial {
            return Err(EngineError::Validation {
                field: "planId".to_string(),
                message: "The trial cannot be selected as a plan".to_string(),
            });
        }

        if target.id == account.plan_id && cycle == account.billing_cycle {
            return Ok(account);
        }

        let current = self.catalog.plan(account.plan_id);
        let amount = target.price.for_cycle(cycle);
        // Against what the account pays now, so a cheaper plan on a longer
        // cycle is still charged
        let downgrade = amount < current.price.for_cycle(account.billing_cycle);

        if amount > 0 && !downgrade {
            let request = PaymentRequest {
                account_id: account.id,
                plan_id: target.id,
                cycle,
                amount,
                payment_method: payment_method.to_string(),
            };

            let outcome = self
                .bounded("payment gateway", self.payments.confirm(&request))
                .await?
                .map_err(|e| EngineError::PaymentFailed(e.to_string()))?;

            if !outcome.success {
                let reason = outcome
                    .error
                    .unwrap_or_else(|| "Payment was declined".to_string());
                tracing::info!(account_id = %account.id, plan = %target.id, %reason, "Payment declined");
                return Err(EngineError::PaymentFailed(reason));
            }
        }

        let updated = self
            .directory
            .change_plan(account.id, target, cycle)
            .map_err(|e| {
                if amount > 0 && !downgrade {
                    tracing::error!(
                        account_id = %account.id,
                        plan = %target.id,
                        amount,
                        error = %e,
                        "Payment confirmed but plan not changed"
                    );
                }
                EngineError::from(e)
            })?;

        tracing::info!(
            account_id = %account.id,
            from = %current.id,
            to = %target.id,
            downgrade,
            "Plan switched"
        );

        Ok(updated)
    }

    /// Current-period usage of the session's account
    pub async fn usage(&self, token: &str) -> EngineResult<UsageReport> {
        let account = self.authorize(token)?;
        let plan = self.catalog.plan(account.plan_id);
        let (period_start, period_end) =
            billing_period(account.billing_anchor(), account.billing_cycle, self.clock.now());

        Ok(UsageReport {
            plan: PlanView::from(plan),
            billing_cycle: account.billing_cycle,
            period_start,
            period_end,
            usage: self.ledger.usage_snapshot(account.id, plan),
        })
    }

    /// Whether the session's current plan includes a gated feature
    pub async fn has_feature(&self, token: &str, feature: Feature) -> EngineResult<bool> {
        let account = self.authorize(token)?;
        Ok(self.catalog.has_feature(account.plan_id, feature))
    }

    /// Plan catalog for display
    pub async fn plans(&self, token: &str) -> EngineResult<Vec<PlanView>> {
        self.authorize(token)?;
        Ok(self.catalog.views())
    }

    /// Updates profile fields and preferences
    pub async fn update_profile(&self, token: &str, update: ProfileUpdate) -> EngineResult<Account> {
        let account = self.authorize(token)?;
        Ok(self.directory.update_profile(account.id, update)?)
    }

    /// Mails a password reset link
    ///
    /// Always succeeds so callers cannot learn which emails have accounts.
    pub async fn request_password_reset(&self, email: &str) -> EngineResult<()> {
        let Some(account) = self.directory.find_by_email(email) else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };
        if account.is_disabled() {
            return Ok(());
        }

        let claims = TokenClaims::new(
            account.id,
            &account.email,
            TokenPurpose::PasswordReset,
            self.clock.now(),
            self.config.reset_ttl,
        );
        let reset_token = create_token(&claims, &self.config.token_secret)?;

        let email = OutboundEmail {
            to: account.email.clone(),
            kind: EmailKind::PasswordReset,
            subject: "Reset your BrandAI password".to_string(),
            body: "Use the link below to choose a new password. It expires in one hour."
                .to_string(),
            token: reset_token,
        };

        match self.bounded("mailer", self.mailer.send(&email)).await {
            Ok(Ok(())) => tracing::info!(account_id = %account.id, "Password reset email sent"),
            Ok(Err(e)) => {
                tracing::error!(account_id = %account.id, error = %e, "Password reset email failed")
            }
            Err(e) => tracing::error!(account_id = %account.id, error = %e, "Password reset email failed"),
        }

        Ok(())
    }

    /// Sets a new password with a mailed reset token
    ///
    /// Each token works once. Every session of the account is revoked.
    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> EngineResult<()> {
        let claims = validate_token(
            reset_token,
            &self.config.token_secret,
            TokenPurpose::PasswordReset,
            self.clock.now(),
        )?;

        let account = self.directory.get(claims.sub)?;
        if account.is_disabled()
            || normalize_email(&claims.email) != normalize_email(&account.email)
        {
            return Err(EngineError::VerificationFailed(
                "Token no longer matches the account".to_string(),
            ));
        }

        // Claim the token before hashing so concurrent redemptions cannot both pass
        let digest = token_digest(reset_token);
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC);
        match self.spent_tokens.entry(digest.clone()) {
            Entry::Occupied(_) => {
                return Err(EngineError::VerificationFailed(
                    "Token has already been used".to_string(),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
            }
        }

        if let Err(e) = self.directory.set_password(account.id, new_password) {
            // Rejected passwords leave the token redeemable
            self.spent_tokens.remove(&digest);
            return Err(e.into());
        }

        let revoked = self.sessions.revoke_all(account.id);
        tracing::info!(account_id = %account.id, revoked, "Password reset");

        Ok(())
    }

    /// Soft-disables the session's account and ends all its sessions
    pub async fn disable_account(&self, token: &str) -> EngineResult<()> {
        let account = self.authorize(token)?;
        self.directory.disable(account.id)?;
        self.sessions.revoke_all(account.id);
        Ok(())
    }

    /// Purges expired sessions and spent tokens, and ends elapsed trials
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let now = self.clock.now();
        let mut report = MaintenanceReport {
            sessions_purged: self.sessions.purge_expired(now),
            ..Default::default()
        };

        for account_id in self.directory.expired_trials(now) {
            match self.directory.expire_trial(account_id, now) {
                Ok(true) => report.trials_expired += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(account_id = %account_id, error = %e, "Trial expiry failed"),
            }
        }

        let before = self.spent_tokens.len();
        self.spent_tokens.retain(|_, expires_at| *expires_at > now);
        report.spent_tokens_purged = before.saturating_sub(self.spent_tokens.len());

        report
    }

    /// Resolves a token to its up-to-date account
    fn authorize(&self, token: &str) -> EngineResult<Account> {
        let session = self.sessions.resolve(token)?;

        let account = match self.directory.get(session.account_id) {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(account_id = %session.account_id, "Session refers to a missing account");
                self.sessions.revoke(token);
                return Err(e.into());
            }
        };

        if account.is_disabled() {
            self.sessions.revoke_all(account.id);
            return Err(EngineError::SessionNotFound);
        }

        self.apply_trial_expiry(account)
    }

    fn apply_trial_expiry(&self, account: Account) -> EngineResult<Account> {
        let now = self.clock.now();
        if !account.trial_elapsed(now) {
            return Ok(account);
        }

        self.directory.expire_trial(account.id, now)?;
        Ok(self.directory.get(account.id)?)
    }

    fn charge(&self, account: &Account, kind: ResourceKind, amount: u32) -> EngineResult<UsageReceipt> {
        let entitlement = Entitlement {
            plan: self.catalog.plan(account.plan_id),
            cycle: account.billing_cycle,
            anchor: account.billing_anchor(),
        };

        Ok(self
            .ledger
            .check_and_consume(account.id, kind, &entitlement, amount)?)
    }

    /// Applies the collaborator deadline
    async fn bounded<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = CollaboratorResult<T>>,
    ) -> EngineResult<CollaboratorResult<T>> {
        tokio::time::timeout(self.config.collaborator_timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(
                    collaborator = what,
                    timeout_ms = self.config.collaborator_timeout.as_millis() as u64,
                    "Collaborator call timed out"
                );
                EngineError::CollaboratorTimeout(what)
            })
    }
}
