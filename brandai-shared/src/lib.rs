//! # BrandAI Shared Library
//!
//! Account lifecycle and entitlement core shared by the BrandAI services and
//! the maintenance worker.
//!
//! ## Module Organization
//!
//! - `models`: Accounts, plans, sessions and usage counters
//! - `auth`: Credential hashing, session tokens, verification/reset tokens
//! - `catalog`: Immutable plan catalog
//! - `directory`: Account records and credential checks
//! - `sessions`: Bearer-token session store
//! - `ledger`: Per-period usage counters and quota enforcement
//! - `collaborators`: Payment, generation and mail interfaces
//! - `engine`: Lifecycle orchestration over all of the above
//! - `config`: Configuration management
//! - `clock`: Injectable time source
//! - `error`: Engine error type

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod sessions;

/// Current version of the BrandAI shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
