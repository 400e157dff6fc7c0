/// Session store
///
/// Maps opaque bearer tokens to [`Session`] records. Only the SHA-256 digest
/// of each token is kept; the plaintext leaves the store exactly once, in the
/// [`IssuedSession`] returned by [`SessionStore::issue`].
///
/// Records are indexed by digest and by account so that `revoke_all` does not
/// scan the whole table. Both indexes sit behind a single `parking_lot::RwLock`:
/// a `resolve` racing a `revoke_all` observes either every session of the
/// account or none of them.
///
/// # Example
///
/// ```
/// use brandai_shared::clock::SystemClock;
/// use brandai_shared::config::SessionConfig;
/// use brandai_shared::sessions::SessionStore;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let store = SessionStore::new(Arc::new(SystemClock), SessionConfig::default());
/// let account_id = Uuid::new_v4();
///
/// let issued = store.issue(account_id, false);
/// assert_eq!(store.resolve(&issued.token).unwrap().account_id, account_id);
///
/// store.revoke(&issued.token);
/// assert!(store.resolve(&issued.token).is_err());
/// ```

use crate::auth::session_token::{
    generate_session_token, hash_session_token, validate_session_token_format,
};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::models::account::AccountId;
use crate::models::session::{IssuedSession, Session};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Session lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Unknown, revoked or malformed token
    #[error("Session not found")]
    SessionNotFound,

    /// Token was valid but its TTL has passed
    #[error("Session expired")]
    SessionExpired,
}

#[derive(Default)]
struct Tables {
    by_digest: HashMap<String, Session>,
    by_account: HashMap<AccountId, HashSet<String>>,
}

impl Tables {
    fn remove(&mut self, digest: &str) -> Option<Session> {
        let session = self.by_digest.remove(digest)?;
        if let Some(digests) = self.by_account.get_mut(&session.account_id) {
            digests.remove(digest);
            if digests.is_empty() {
                self.by_account.remove(&session.account_id);
            }
        }
        Some(session)
    }
}

/// In-memory session store
pub struct SessionStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates an empty store
    pub fn new(clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        SessionStore {
            tables: RwLock::new(Tables::default()),
            clock,
            config,
        }
    }

    /// Issues a new session for an account
    pub fn issue(&self, account_id: AccountId, remember_me: bool) -> IssuedSession {
        let now = self.clock.now();
        let session = Session {
            account_id,
            issued_at: now,
            expires_at: now + self.config.ttl(remember_me),
            remember_me,
        };

        let mut tables = self.tables.write();
        let (token, digest) = loop {
            let (token, digest) = generate_session_token();
            if !tables.by_digest.contains_key(&digest) {
                break (token, digest);
            }
            tracing::warn!("Session token collision, re-rolling");
        };

        tables
            .by_account
            .entry(account_id)
            .or_default()
            .insert(digest.clone());
        tables.by_digest.insert(digest, session.clone());
        drop(tables);

        tracing::debug!(account_id = %account_id, remember_me, "Session issued");

        IssuedSession { token, session }
    }

    /// Resolves a bearer token to its session
    ///
    /// An expired record is removed as a side effect.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionNotFound` for unknown, revoked or malformed tokens
    /// - `SessionError::SessionExpired` once `now >= expires_at`
    pub fn resolve(&self, token: &str) -> Result<Session, SessionError> {
        if !validate_session_token_format(token) {
            return Err(SessionError::SessionNotFound);
        }

        let digest = hash_session_token(token);
        let now = self.clock.now();

        {
            let tables = self.tables.read();
            match tables.by_digest.get(&digest) {
                None => return Err(SessionError::SessionNotFound),
                Some(session) if !session.is_expired(now) => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        let mut tables = self.tables.write();
        match tables.by_digest.get(&digest) {
            None => Err(SessionError::SessionNotFound),
            Some(session) if !session.is_expired(now) => Ok(session.clone()),
            Some(_) => {
                tables.remove(&digest);
                Err(SessionError::SessionExpired)
            }
        }
    }

    /// Revokes one session; returns `true` if it existed
    pub fn revoke(&self, token: &str) -> bool {
        let digest = hash_session_token(token);
        let removed = self.tables.write().remove(&digest);

        if let Some(session) = &removed {
            tracing::debug!(account_id = %session.account_id, "Session revoked");
        }

        removed.is_some()
    }

    /// Revokes every session of an account; returns how many were removed
    pub fn revoke_all(&self, account_id: AccountId) -> usize {
        let mut tables = self.tables.write();
        let Some(digests) = tables.by_account.remove(&account_id) else {
            return 0;
        };
        for digest in &digests {
            tables.by_digest.remove(digest);
        }
        drop(tables);

        tracing::info!(account_id = %account_id, revoked = digests.len(), "All sessions revoked");

        digests.len()
    }

    /// Removes every session expired at `now`; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write();
        let expired: Vec<String> = tables
            .by_digest
            .iter()
            .filter(|(_, session)| session.is_expired(now))
            .map(|(digest, _)| digest.clone())
            .collect();

        for digest in &expired {
            tables.remove(digest);
        }

        expired.len()
    }

    /// Number of unexpired sessions held by an account
    pub fn active_count(&self, account_id: AccountId) -> usize {
        let now = self.clock.now();
        let tables = self.tables.read();
        tables
            .by_account
            .get(&account_id)
            .map(|digests| {
                digests
                    .iter()
                    .filter_map(|digest| tables.by_digest.get(digest))
                    .filter(|session| !session.is_expired(now))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Total number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.tables.read().by_digest.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;
    use uuid::Uuid;

    fn store() -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (SessionStore::new(clock.clone(), SessionConfig::default()), clock)
    }

    #[test]
    fn test_issue_and_resolve() {
        let (store, clock) = store();
        let account_id = Uuid::new_v4();

        let issued = store.issue(account_id, false);
        assert_eq!(issued.session.expires_at, clock.now() + Duration::hours(24));

        let session = store.resolve(&issued.token).unwrap();
        assert_eq!(session, issued.session);
    }

    #[test]
    fn test_remember_me_uses_long_ttl() {
        let (store, clock) = store();
        let issued = store.issue(Uuid::new_v4(), true);
        assert_eq!(issued.session.expires_at, clock.now() + Duration::days(30));
        assert!(issued.session.remember_me);
    }

    #[test]
    fn test_store_keeps_only_digest() {
        let (store, _) = store();
        let issued = store.issue(Uuid::new_v4(), false);

        let tables = store.tables.read();
        assert!(!tables.by_digest.contains_key(&issued.token));
        assert!(tables.by_digest.contains_key(&hash_session_token(&issued.token)));
    }

    #[test]
    fn test_expired_session_is_removed_on_resolve() {
        let (store, clock) = store();
        let issued = store.issue(Uuid::new_v4(), false);

        clock.advance(Duration::hours(24));
        assert_eq!(store.resolve(&issued.token), Err(SessionError::SessionExpired));
        assert_eq!(store.resolve(&issued.token), Err(SessionError::SessionNotFound));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_and_malformed_tokens() {
        let (store, _) = store();
        assert_eq!(store.resolve("garbage"), Err(SessionError::SessionNotFound));

        let (token, _) = generate_session_token();
        assert_eq!(store.resolve(&token), Err(SessionError::SessionNotFound));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let (store, _) = store();
        let issued = store.issue(Uuid::new_v4(), false);

        assert!(store.revoke(&issued.token));
        assert!(!store.revoke(&issued.token));
        assert_eq!(store.resolve(&issued.token), Err(SessionError::SessionNotFound));
    }

    #[test]
    fn test_revoke_all_only_touches_one_account() {
        let (store, _) = store();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let a1 = store.issue(alice, false);
        let a2 = store.issue(alice, true);
        let b1 = store.issue(bob, false);
        assert_eq!(store.active_count(alice), 2);

        assert_eq!(store.revoke_all(alice), 2);
        assert_eq!(store.revoke_all(alice), 0);

        assert!(store.resolve(&a1.token).is_err());
        assert!(store.resolve(&a2.token).is_err());
        assert!(store.resolve(&b1.token).is_ok());
        assert_eq!(store.active_count(alice), 0);
        assert_eq!(store.active_count(bob), 1);
    }

    #[test]
    fn test_purge_expired() {
        let (store, clock) = store();
        let account_id = Uuid::new_v4();

        store.issue(account_id, false);
        let long = store.issue(account_id, true);

        clock.advance(Duration::days(2));
        assert_eq!(store.active_count(account_id), 1);
        assert_eq!(store.purge_expired(clock.now()), 1);
        assert_eq!(store.len(), 1);
        assert!(store.resolve(&long.token).is_ok());
    }
}
