/// Usage ledger
///
/// Per-account counters for consumable resources, enforced against the limits
/// of the account's current plan.
///
/// # Atomicity
///
/// Counters live in a `DashMap` keyed by `(account, resource kind)`.
/// [`UsageLedger::check_and_consume`] does its rollover, limit check and
/// increment while holding the entry's shard lock, so two concurrent consumers
/// competing for the last unit cannot both win. A rejected attempt never
/// mutates the counter.
///
/// # Periods
///
/// A counter is created lazily on first consumption for the billing window
/// containing `now` (see [`billing_period`]). Once `now >= period_end` the
/// next consumption resets it to the current window. Changing plan does not
/// touch counters: the new limit applies to the existing count immediately.
///
/// # Example
///
/// ```
/// use brandai_shared::catalog::PlanCatalog;
/// use brandai_shared::clock::SystemClock;
/// use brandai_shared::ledger::{Entitlement, UsageLedger};
/// use brandai_shared::models::plan::{BillingCycle, PlanId, ResourceKind};
/// use chrono::Utc;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let catalog = PlanCatalog::builtin();
/// let ledger = UsageLedger::new(Arc::new(SystemClock));
/// let entitlement = Entitlement {
///     plan: catalog.plan(PlanId::Free),
///     cycle: BillingCycle::Monthly,
///     anchor: Utc::now(),
/// };
///
/// let account_id = Uuid::new_v4();
/// let receipt = ledger
///     .check_and_consume(account_id, ResourceKind::LogoGeneration, &entitlement, 1)
///     .unwrap();
/// assert_eq!(receipt.remaining, Some(14));
/// ```

use crate::clock::Clock;
use crate::models::account::AccountId;
use crate::models::plan::{BillingCycle, Limit, Plan, ResourceKind};
use crate::models::usage::{billing_period, UsageCounter, UsageLine, UsageSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Quota enforcement error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    /// Consuming would push the counter past the plan limit
    #[error("{} limit exceeded ({current}/{limit})", .kind.label())]
    LimitExceeded {
        kind: ResourceKind,
        limit: u32,
        current: u32,
    },
}

/// What an account is entitled to at the moment of a check
#[derive(Debug, Clone, Copy)]
pub struct Entitlement<'a> {
    /// Current plan
    pub plan: &'a Plan,

    /// Current billing cycle
    pub cycle: BillingCycle,

    /// Anchor of the billing periods
    pub anchor: DateTime<Utc>,
}

/// Proof of a successful consumption
///
/// Hand it back to [`UsageLedger::refund`] if the work it paid for did not
/// happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReceipt {
    pub account_id: AccountId,
    pub kind: ResourceKind,
    pub amount: u32,

    /// Start of the period the units were charged to
    pub period_start: DateTime<Utc>,

    /// Counter value after consumption
    pub used: u32,

    /// Units left, or `None` when unlimited
    pub remaining: Option<u32>,
}

/// In-memory usage counters
pub struct UsageLedger {
    counters: DashMap<(AccountId, ResourceKind), UsageCounter>,
    clock: Arc<dyn Clock>,
}

impl UsageLedger {
    /// Creates an empty ledger
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        UsageLedger {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Atomically checks the limit and consumes `amount` units
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::LimitExceeded` when `count + amount` would exceed
    /// a bounded limit; the counter is left unchanged.
    pub fn check_and_consume(
        &self,
        account_id: AccountId,
        kind: ResourceKind,
        entitlement: &Entitlement<'_>,
        amount: u32,
    ) -> Result<UsageReceipt, QuotaError> {
        let now = self.clock.now();
        let limit = entitlement.plan.limit(kind);
        let (start, end) = billing_period(entitlement.anchor, entitlement.cycle, now);

        let mut entry = self
            .counters
            .entry((account_id, kind))
            .or_insert_with(|| UsageCounter::empty(start, end));
        let counter = entry.value_mut();

        if counter.has_rolled_over(now) {
            tracing::debug!(
                account_id = %account_id,
                kind = %kind,
                previous = counter.count,
                "Usage period rolled over"
            );
            *counter = UsageCounter::empty(start, end);
        }

        if !limit.allows(counter.count, amount) {
            let max = match limit {
                Limit::Bounded(max) => max,
                Limit::Unlimited => u32::MAX,
            };
            tracing::info!(
                account_id = %account_id,
                kind = %kind,
                used = counter.count,
                limit = max,
                "Quota exceeded"
            );
            return Err(QuotaError::LimitExceeded {
                kind,
                limit: max,
                current: counter.count,
            });
        }

        counter.count = counter.count.saturating_add(amount);

        Ok(UsageReceipt {
            account_id,
            kind,
            amount,
            period_start: counter.period_start,
            used: counter.count,
            remaining: limit.remaining(counter.count),
        })
    }

    /// Returns units charged by `receipt`
    ///
    /// Ignored when the counter has since moved to another period. Returns
    /// `true` if anything was credited back.
    pub fn refund(&self, receipt: &UsageReceipt) -> bool {
        let Some(mut counter) = self.counters.get_mut(&(receipt.account_id, receipt.kind)) else {
            return false;
        };

        if counter.period_start != receipt.period_start {
            return false;
        }

        counter.count = counter.count.saturating_sub(receipt.amount);

        tracing::debug!(
            account_id = %receipt.account_id,
            kind = %receipt.kind,
            amount = receipt.amount,
            "Usage refunded"
        );

        true
    }

    /// Usage of every resource kind for display
    ///
    /// Counters of an ended period read as zero. For bounded limits `used` is
    /// capped at the limit, which only matters after a downgrade left the
    /// count above the new plan's limit.
    pub fn usage_snapshot(&self, account_id: AccountId, plan: &Plan) -> UsageSnapshot {
        let now = self.clock.now();

        ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let limit = plan.limit(kind);
                let used = self
                    .counters
                    .get(&(account_id, kind))
                    .filter(|counter| !counter.has_rolled_over(now))
                    .map(|counter| counter.count)
                    .unwrap_or(0);
                let used = match limit {
                    Limit::Bounded(max) => used.min(max),
                    Limit::Unlimited => used,
                };
                (kind, UsageLine { used, limit })
            })
            .collect()
    }

    /// Raw counter for an account and kind, if one exists
    pub fn counter(&self, account_id: AccountId, kind: ResourceKind) -> Option<UsageCounter> {
        self.counters.get(&(account_id, kind)).map(|counter| *counter)
    }
}
