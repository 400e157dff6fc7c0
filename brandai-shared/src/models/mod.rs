/// Domain models
///
/// # Models
///
/// - `account`: Account records, signup/login/profile inputs
/// - `plan`: Plan identifiers, limits, prices and resource kinds
/// - `session`: Session records and issued bearer tokens
/// - `usage`: Usage counters, billing periods and snapshots

pub mod account;
pub mod plan;
pub mod session;
pub mod usage;
