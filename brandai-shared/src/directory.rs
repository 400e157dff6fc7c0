/// Account directory
///
/// Owns every [`Account`] record and the credentials attached to it. Lookups
/// by email are case-insensitive through a normalized index; the display
/// casing of the address is preserved on the record.
///
/// # Locking
///
/// Both tables live behind one `parking_lot::RwLock`. Argon2 hashing and
/// verification always run with the lock released; creation re-checks email
/// uniqueness under the write lock before inserting, so two concurrent signups
/// for the same address cannot both succeed.
///
/// # Timing
///
/// `authenticate` performs exactly one Argon2 verification whether or not
/// the email is known (unknown emails verify against a dummy
/// hash), so response time does not reveal which addresses have accounts.
///
/// # Example
///
/// ```
/// use brandai_shared::auth::password::PasswordParams;
/// use brandai_shared::catalog::PlanCatalog;
/// use brandai_shared::clock::SystemClock;
/// use brandai_shared::directory::AccountDirectory;
/// use brandai_shared::models::account::SignupData;
/// use chrono::Duration;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let directory = AccountDirectory::new(
///     Arc::new(PlanCatalog::builtin()),
///     Arc::new(SystemClock),
///     PasswordParams::minimal(),
///     Duration::days(14),
/// );
///
/// let account = directory.create_account(SignupData {
///     first_name: "Ada".into(),
///     last_name: "Lovelace".into(),
///     email: "Ada@Example.com".into(),
///     password: "Secret123".into(),
///     accepted_terms: true,
///     ..Default::default()
/// })?;
///
/// let same = directory.authenticate("ada@example.com", "Secret123")?;
/// assert_eq!(same.id, account.id);
/// # Ok(())
/// # }
/// ```

use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, PasswordError, PasswordParams,
};
use crate::catalog::PlanCatalog;
use crate::clock::Clock;
use crate::models::account::{
    normalize_email, Account, AccountId, Marketing, Preferences, Profile, ProfileUpdate,
    SignupData,
};
use crate::models::plan::{BillingCycle, Plan};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Password verified against when the email is unknown
const DUMMY_PASSWORD: &str = "brandai-dummy-credential-0";

/// Account directory errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Input rejected by a validation rule
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Another account already uses this email
    #[error("Email already registered")]
    EmailAlreadyExists,

    /// Unknown email, wrong password or disabled account
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No account with this ID
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account was disabled and accepts no further changes
    #[error("Account disabled: {0}")]
    AccountDisabled(AccountId),

    /// Credential hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl DirectoryError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        DirectoryError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// First field error reported by `validator`
    fn from_validation(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .find_map(|(field, errors)| {
                errors.first().map(|error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string());
                    DirectoryError::validation(&field, message)
                })
            })
            .unwrap_or_else(|| DirectoryError::validation("request", "Validation failed"))
    }
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

/// In-memory account store
pub struct AccountDirectory {
    tables: RwLock<Tables>,
    catalog: Arc<PlanCatalog>,
    clock: Arc<dyn Clock>,
    params: PasswordParams,
    trial_duration: Duration,
    dummy_hash: OnceCell<String>,
}

impl AccountDirectory {
    /// Creates an empty directory
    pub fn new(
        catalog: Arc<PlanCatalog>,
        clock: Arc<dyn Clock>,
        params: PasswordParams,
        trial_duration: Duration,
    ) -> Self {
        // Built up front so the first unknown-email login costs one hash, not two
        let dummy_hash = OnceCell::new();
        match hash_password(DUMMY_PASSWORD, &params) {
            Ok(hash) => {
                let _ = dummy_hash.set(hash);
            }
            Err(e) => {
                tracing::error!(error = %e, "Dummy credential unavailable, retrying on first use")
            }
        }

        AccountDirectory {
            tables: RwLock::new(Tables::default()),
            catalog,
            clock,
            params,
            trial_duration,
            dummy_hash,
        }
    }

    /// Registers a new account on the default trial plan
    ///
    /// # Errors
    ///
    /// - `DirectoryError::Validation` for missing fields, malformed email, weak
    ///   password or unaccepted terms
    /// - `DirectoryError::EmailAlreadyExists` if the normalized email is taken
    pub fn create_account(&self, signup: SignupData) -> Result<Account, DirectoryError> {
        signup.validate().map_err(DirectoryError::from_validation)?;

        if signup.first_name.trim().is_empty() {
            return Err(DirectoryError::validation("firstName", "First name is required"));
        }
        if signup.last_name.trim().is_empty() {
            return Err(DirectoryError::validation("lastName", "Last name is required"));
        }
        validate_password_strength(&signup.password)
            .map_err(|message| DirectoryError::validation("password", message))?;
        if !signup.accepted_terms {
            return Err(DirectoryError::validation(
                "acceptedTerms",
                "You must accept the terms and conditions",
            ));
        }

        let key = normalize_email(&signup.email);

        // Cheap early rejection before paying for a hash
        if self.tables.read().by_email.contains_key(&key) {
            return Err(DirectoryError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&signup.password, &self.params)?;

        let now = self.clock.now();
        let trial = self.catalog.default_trial_plan();
        let account = Account {
            id: Uuid::new_v4(),
            email: signup.email.trim().to_string(),
            password_hash,
            profile: Profile {
                first_name: signup.first_name.trim().to_string(),
                last_name: signup.last_name.trim().to_string(),
                avatar: None,
                phone: signup.phone,
                company: signup.company,
                job_title: signup.job_title,
            },
            marketing: Marketing {
                source: signup.source,
                campaign: signup.campaign,
                referral_code: signup.referral_code,
                accepted_marketing: signup.accepted_marketing,
                tags: Vec::new(),
            },
            preferences: Preferences {
                notifications: true,
                newsletter: signup.accepted_marketing,
                product_updates: true,
            },
            email_verified: false,
            plan_id: trial.id,
            billing_cycle: BillingCycle::Monthly,
            trial_started_at: Some(now),
            trial_ends_at: Some(now + self.trial_duration),
            created_at: now,
            updated_at: now,
            last_login_at: None,
            login_count: 0,
            disabled_at: None,
        };

        let mut tables = self.tables.write();
        if tables.by_email.contains_key(&key) {
            return Err(DirectoryError::EmailAlreadyExists);
        }
        tables.by_email.insert(key, account.id);
        tables.accounts.insert(account.id, account.clone());
        drop(tables);

        tracing::info!(account_id = %account.id, plan = %account.plan_id, "Account created");

        Ok(account)
    }

    /// Verifies credentials
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::InvalidCredentials` for an unknown email, a
    /// wrong password or a disabled account, without distinguishing them
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Account, DirectoryError> {
        let account = self.find_by_email(email);

        let Some(account) = account else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| hash_password(DUMMY_PASSWORD, &self.params))?;
            let _ = verify_password(password, dummy);
            return Err(DirectoryError::InvalidCredentials);
        };

        let matches = match verify_password(password, &account.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(error = %e, account_id = %account.id, "Stored credential is unreadable");
                false
            }
        };

        if !matches || account.is_disabled() {
            return Err(DirectoryError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Looks up an account by ID
    pub fn get(&self, id: AccountId) -> Result<Account, DirectoryError> {
        self.tables
            .read()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::AccountNotFound(id))
    }

    /// Looks up an account by email, ignoring case and surrounding whitespace
    pub fn find_by_email(&self, email: &str) -> Option<Account> {
        let tables = self.tables.read();
        tables
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| tables.accounts.get(id))
            .cloned()
    }

    /// Marks the email as verified
    ///
    /// Idempotent: returns `true` only when the flag actually changed.
    pub fn mark_verified(&self, id: AccountId) -> Result<bool, DirectoryError> {
        let now = self.clock.now();
        self.update(id, |account| {
            if account.email_verified {
                return false;
            }
            account.email_verified = true;
            account.updated_at = now;
            true
        })
    }

    /// Moves an account to a plan and billing cycle
    ///
    /// Moving to any non-trial plan ends trial semantics (`trial_ends_at` is
    /// cleared). Usage counters are left untouched. Disabled accounts are
    /// rejected under the same lock that applies the change.
    pub fn change_plan(
        &self,
        id: AccountId,
        plan: &Plan,
        cycle: BillingCycle,
    ) -> Result<Account, DirectoryError> {
        let now = self.clock.now();
        let account = self.update(id, |account| {
            if account.is_disabled() {
                return Err(DirectoryError::AccountDisabled(id));
            }
            account.plan_id = plan.id;
            account.billing_cycle = cycle;
            if !plan.is_trial {
                account.trial_ends_at = None;
            }
            account.updated_at = now;
            Ok(account.clone())
        })??;

        tracing::info!(account_id = %id, plan = %plan.id, ?cycle, "Plan changed");

        Ok(account)
    }

    /// Records a successful login and returns the updated account
    ///
    /// Never fails: a vanished account is logged and ignored.
    pub fn record_login(&self, id: AccountId) -> Option<Account> {
        let now = self.clock.now();
        let result = self.update(id, |account| {
            account.login_count += 1;
            account.last_login_at = Some(now);
            account.clone()
        });

        match result {
            Ok(account) => Some(account),
            Err(_) => {
                tracing::warn!(account_id = %id, "Login recorded for unknown account");
                None
            }
        }
    }

    /// Applies a profile update
    pub fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, DirectoryError> {
        update.validate().map_err(DirectoryError::from_validation)?;

        let now = self.clock.now();
        self.update(id, |account| {
            let profile = &mut account.profile;
            if let Some(first_name) = update.first_name {
                profile.first_name = first_name.trim().to_string();
            }
            if let Some(last_name) = update.last_name {
                profile.last_name = last_name.trim().to_string();
            }
            if let Some(avatar) = update.avatar {
                profile.avatar = Some(avatar);
            }
            if let Some(phone) = update.phone {
                profile.phone = Some(phone);
            }
            if let Some(company) = update.company {
                profile.company = Some(company);
            }
            if let Some(job_title) = update.job_title {
                profile.job_title = Some(job_title);
            }

            let preferences = &mut account.preferences;
            if let Some(newsletter) = update.newsletter {
                preferences.newsletter = newsletter;
            }
            if let Some(notifications) = update.notifications {
                preferences.notifications = notifications;
            }
            if let Some(product_updates) = update.product_updates {
                preferences.product_updates = product_updates;
            }

            account.updated_at = now;
            account.clone()
        })
    }

    /// Replaces the account credential
    ///
    /// # Errors
    ///
    /// `DirectoryError::Validation` if the new password is too weak
    pub fn set_password(&self, id: AccountId, new_password: &str) -> Result<(), DirectoryError> {
        validate_password_strength(new_password)
            .map_err(|message| DirectoryError::validation("password", message))?;

        // Fail fast before hashing
        self.get(id)?;
        let password_hash = hash_password(new_password, &self.params)?;

        let now = self.clock.now();
        self.update(id, |account| {
            account.password_hash = password_hash;
            account.updated_at = now;
        })?;

        tracing::info!(account_id = %id, "Password changed");

        Ok(())
    }

    /// Soft-disables an account; returns `true` if it was active
    pub fn disable(&self, id: AccountId) -> Result<bool, DirectoryError> {
        let now = self.clock.now();
        let changed = self.update(id, |account| {
            if account.is_disabled() {
                return false;
            }
            account.disabled_at = Some(now);
            account.updated_at = now;
            true
        })?;

        if changed {
            tracing::info!(account_id = %id, "Account disabled");
        }

        Ok(changed)
    }

    /// Moves an elapsed trial to the free plan
    ///
    /// `trial_ends_at` is kept as a record of when the trial ended. Returns
    /// `true` if the account was moved.
    pub fn expire_trial(&self, id: AccountId, now: DateTime<Utc>) -> Result<bool, DirectoryError> {
        let free = self.catalog.free_plan().id;
        let expired = self.update(id, |account| {
            if !account.trial_elapsed(now) {
                return false;
            }
            account.plan_id = free;
            account.billing_cycle = BillingCycle::Monthly;
            account.updated_at = now;
            true
        })?;

        if expired {
            tracing::info!(account_id = %id, "Trial expired, moved to free plan");
        }

        Ok(expired)
    }

    /// Accounts whose trial has elapsed at `now` but have not been moved yet
    pub fn expired_trials(&self, now: DateTime<Utc>) -> Vec<AccountId> {
        self.tables
            .read()
            .accounts
            .values()
            .filter(|account| !account.is_disabled() && account.trial_elapsed(now))
            .map(|account| account.id)
            .collect()
    }

    /// Number of accounts, disabled ones included
    pub fn len(&self) -> usize {
        self.tables.read().accounts.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<T>(
        &self,
        id: AccountId,
        apply: impl FnOnce(&mut Account) -> T,
    ) -> Result<T, DirectoryError> {
        let mut tables = self.tables.write();
        let account = tables
            .accounts
            .get_mut(&id)
            .ok_or(DirectoryError::AccountNotFound(id))?;
        Ok(apply(account))
    }
}
