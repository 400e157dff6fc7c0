/// Session model
///
/// A session is the proof of a prior successful authentication. The bearer
/// token itself is handed to the caller exactly once, in [`IssuedSession`];
/// the [`SessionStore`](crate::sessions::SessionStore) keeps only its SHA-256
/// digest next to the [`Session`] record.

use crate::models::account::AccountId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Owning account
    pub account_id: AccountId,

    /// When the session was issued
    pub issued_at: DateTime<Utc>,

    /// When the session stops resolving
    pub expires_at: DateTime<Utc>,

    /// Whether the long TTL was requested
    pub remember_me: bool,
}

impl Session {
    /// Whether the session has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A freshly issued session together with its plaintext bearer token
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Bearer token; not recoverable from the store afterwards
    pub token: String,

    /// Session record
    pub session: Session,
}
