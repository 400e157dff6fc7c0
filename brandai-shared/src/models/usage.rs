/// Usage counter model and billing period arithmetic
///
/// A counter tallies consumption of one resource kind by one account within a
/// single billing period. Periods are windows of one or twelve months anchored
/// at the account's billing anchor; the window containing `now` is computed by
/// [`billing_period`].
///
/// # Example
///
/// ```
/// use brandai_shared::models::plan::BillingCycle;
/// use brandai_shared::models::usage::billing_period;
/// use chrono::{TimeZone, Utc};
///
/// let anchor = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
///
/// let (start, end) = billing_period(anchor, BillingCycle::Monthly, now);
/// assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
/// assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap());
/// ```

use crate::models::plan::{BillingCycle, Limit, ResourceKind};
use chrono::{DateTime, Datelike, Months, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Consumption tally for one (account, resource kind) in one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounter {
    /// Units consumed in the period
    pub count: u32,

    /// Inclusive start of the period
    pub period_start: DateTime<Utc>,

    /// Exclusive end of the period
    pub period_end: DateTime<Utc>,
}

impl UsageCounter {
    /// Empty counter for a period
    pub fn empty(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        UsageCounter {
            count: 0,
            period_start,
            period_end,
        }
    }

    /// Whether the period has ended at `now`
    pub fn has_rolled_over(&self, now: DateTime<Utc>) -> bool {
        now >= self.period_end
    }
}

/// One line of a usage snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLine {
    /// Units used in the current period
    pub used: u32,

    /// Plan limit
    pub limit: Limit,
}

/// Usage per resource kind, for display
pub type UsageSnapshot = BTreeMap<ResourceKind, UsageLine>;

fn add_months(anchor: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    anchor
        .checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Computes the billing period window containing `now`
///
/// Windows are always derived from the anchor (never chained from the previous
/// window), so an anchor on the 31st lands on the last day of shorter months
/// without drifting.
pub fn billing_period(
    anchor: DateTime<Utc>,
    cycle: BillingCycle,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let step = cycle.months();

    if now < anchor {
        return (anchor, add_months(anchor, step));
    }

    let elapsed_months = (now.year() - anchor.year()) * 12 + now.month() as i32
        - anchor.month() as i32;
    let mut offset = (elapsed_months.max(0) as u32 / step) * step;

    loop {
        let start = add_months(anchor, offset);
        if start > now && offset >= step {
            offset -= step;
            continue;
        }

        let end = add_months(anchor, offset + step);
        if end <= now && end != DateTime::<Utc>::MAX_UTC {
            offset += step;
            continue;
        }

        return (start, end);
    }
}
