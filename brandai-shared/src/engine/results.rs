/// Engine outcomes and their wire shapes
///
/// Engine operations return typed outcomes inside [`EngineResult`]. The
/// `*Result` types here flatten those into the `{success, error?}` structures
/// handed to callers, using [`EngineError::user_message`] for the error text.
/// Faults are logged at `error!` during the conversion.

use crate::engine::state::AuthState;
use crate::error::{EngineError, EngineResult};
use crate::models::account::Account;
use crate::models::plan::{BillingCycle, PlanView, ResourceKind};
use crate::models::session::Session;
use crate::models::usage::UsageSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Successful login or signup
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub account: Account,

    /// Bearer token; only ever returned here
    pub token: String,

    pub session: Session,
    pub state: AuthState,
    pub requires_verification: bool,
}

/// Successful consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub kind: ResourceKind,

    /// Counter after consumption
    pub used: u32,

    /// Units left, `None` when unlimited
    pub remaining: Option<u32>,
}

/// Current-period usage for an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub plan: PlanView,
    pub billing_cycle: BillingCycle,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub usage: UsageSnapshot,
}

/// Counts of records touched by a maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub sessions_purged: usize,
    pub trials_expired: usize,
    pub spent_tokens_purged: usize,
}

fn user_error(err: &EngineError) -> String {
    if err.is_fault() {
        tracing::error!(error = %err, code = err.code(), "Engine fault");
    }
    err.user_message()
}

/// Wire result of `login` and `signup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_verification: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<EngineResult<AuthOutcome>> for AuthResult {
    fn from(result: EngineResult<AuthOutcome>) -> Self {
        match result {
            Ok(outcome) => AuthResult {
                success: true,
                error: None,
                requires_verification: Some(outcome.requires_verification),
                token: Some(outcome.token),
            },
            Err(err) => AuthResult {
                success: false,
                error: Some(user_error(&err)),
                requires_verification: None,
                token: None,
            },
        }
    }
}

/// Wire result of `consume_resource`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResult {
    pub allowed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<EngineResult<ConsumeOutcome>> for ConsumeResult {
    fn from(result: EngineResult<ConsumeOutcome>) -> Self {
        match result {
            Ok(outcome) => ConsumeResult {
                allowed: true,
                remaining: outcome.remaining,
                error: None,
            },
            Err(err @ EngineError::QuotaExceeded(_)) => ConsumeResult {
                allowed: false,
                remaining: Some(0),
                error: Some(user_error(&err)),
            },
            Err(err) => ConsumeResult {
                allowed: false,
                remaining: None,
                error: Some(user_error(&err)),
            },
        }
    }
}

/// Wire result of operations without a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<EngineResult<T>> for OperationResult {
    fn from(result: EngineResult<T>) -> Self {
        match result {
            Ok(_) => OperationResult {
                success: true,
                error: None,
            },
            Err(err) => OperationResult {
                success: false,
                error: Some(user_error(&err)),
            },
        }
    }
}
