//! In-memory session store
//!
//! One session per chat, created on first contact and kept for the
//! process lifetime. The store is the single writer of the per-chat query
//! counters and the global lookup counter; both are updated under one lock
//! so they are always observed together.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Telegram chat id
pub type ChatKey = i64;

/// Per-chat session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Set once the access code matched; never cleared
    pub authorized: bool,
    /// Successful lookups made from this chat
    pub query_count: u64,
}

/// Result of an access code check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Granted,
    Denied,
    AlreadyAuthorized,
}

/// Snapshot returned by [`SessionStore::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_users: usize,
    pub your_queries: u64,
    pub total_lookups: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Lookup recorded for chat {0} without an authorized session")]
    NotAuthorized(ChatKey),
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<ChatKey, Session>,
    total_lookups: u64,
}

/// Session store shared by the router
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<StoreInner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert-or-default. Returns true if the session was created.
    pub fn touch(&self, chat_id: ChatKey) -> bool {
        let mut inner = self.inner.lock();
        let created = !inner.sessions.contains_key(&chat_id);
        if created {
            inner.sessions.insert(chat_id, Session::default());
        }
        created
    }

    /// Compare a submitted code against the expected one and authorize on match.
    ///
    /// Already authorized sessions are returned as-is without comparing.
    pub fn check_access(&self, chat_id: ChatKey, submitted: &str, expected: &str) -> AuthResult {
        let mut inner = self.inner.lock();
        let session = inner.sessions.entry(chat_id).or_default();

        if session.authorized {
            return AuthResult::AlreadyAuthorized;
        }

        if submitted == expected {
            session.authorized = true;
            AuthResult::Granted
        } else {
            AuthResult::Denied
        }
    }

    pub fn is_authorized(&self, chat_id: ChatKey) -> bool {
        self.inner
            .lock()
            .sessions
            .get(&chat_id)
            .map(|s| s.authorized)
            .unwrap_or(false)
    }

    /// Count one successful lookup for `chat_id`.
    ///
    /// Returns the chat's new query count. Calling this for an unknown or
    /// unauthorized chat is a caller bug and leaves all counters unchanged.
    pub fn record_lookup(&self, chat_id: ChatKey) -> Result<u64, SessionError> {
        let mut inner = self.inner.lock();

        let count = match inner.sessions.get_mut(&chat_id) {
            Some(session) if session.authorized => {
                session.query_count += 1;
                session.query_count
            }
            _ => return Err(SessionError::NotAuthorized(chat_id)),
        };
        inner.total_lookups += 1;

        Ok(count)
    }

    pub fn stats(&self, chat_id: ChatKey) -> StatsSnapshot {
        let inner = self.inner.lock();
        let your_queries = inner
            .sessions
            .get(&chat_id)
            .filter(|s| s.authorized)
            .map(|s| s.query_count)
            .unwrap_or(0);

        StatsSnapshot {
            total_users: inner.sessions.len(),
            your_queries,
            total_lookups: inner.total_lookups,
        }
    }

    /// Copy of a chat's session, if one exists
    pub fn session(&self, chat_id: ChatKey) -> Option<Session> {
        self.inner.lock().sessions.get(&chat_id).cloned()
    }
}

/// Per-chat async locks, held for a whole message flow so two messages
/// from the same chat are never processed concurrently.
#[derive(Default)]
pub struct ChatLocks {
    locks: Mutex<HashMap<ChatKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, chat_id: ChatKey) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(chat_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_code_flow() {
        let store = SessionStore::new();

        assert_eq!(store.check_access(1, "wrong", "1234"), AuthResult::Denied);
        assert!(!store.is_authorized(1));

        assert_eq!(store.check_access(1, "1234", "1234"), AuthResult::Granted);
        assert!(store.is_authorized(1));

        let before = store.session(1);
        assert_eq!(store.check_access(1, "1234", "1234"), AuthResult::AlreadyAuthorized);
        assert_eq!(store.session(1), before);
    }

    #[test]
    fn test_authorization_is_monotone() {
        let store = SessionStore::new();
        store.check_access(7, "1234", "1234");
        assert_eq!(store.check_access(7, "wrong", "1234"), AuthResult::AlreadyAuthorized);
        assert!(store.is_authorized(7));
    }

    #[test]
    fn test_code_comparison_is_exact() {
        let store = SessionStore::new();
        assert_eq!(store.check_access(1, "1234 ", "1234"), AuthResult::Denied);
        assert_eq!(store.check_access(1, "ABC", "abc"), AuthResult::Denied);
    }

    #[test]
    fn test_touch_creates_once() {
        let store = SessionStore::new();
        assert!(store.touch(5));
        assert!(!store.touch(5));
        assert_eq!(store.session(5), Some(Session::default()));
    }

    #[test]
    fn test_unknown_chat_is_not_authorized() {
        let store = SessionStore::new();
        assert!(!store.is_authorized(42));
        assert_eq!(store.session(42), None);
    }

    #[test]
    fn test_record_lookup_updates_both_counters() {
        let store = SessionStore::new();
        store.check_access(1, "c", "c");
        store.check_access(2, "c", "c");

        assert_eq!(store.record_lookup(1).unwrap(), 1);
        assert_eq!(store.record_lookup(1).unwrap(), 2);
        assert_eq!(store.record_lookup(2).unwrap(), 1);

        let stats = store.stats(1);
        assert_eq!(stats.your_queries, 2);
        assert_eq!(stats.total_lookups, 3);
        assert!(stats.your_queries <= stats.total_lookups);
    }

    #[test]
    fn test_record_lookup_requires_authorization() {
        let store = SessionStore::new();
        store.touch(3);

        assert!(matches!(store.record_lookup(3), Err(SessionError::NotAuthorized(3))));
        assert!(matches!(store.record_lookup(99), Err(SessionError::NotAuthorized(99))));
        assert_eq!(store.stats(3).total_lookups, 0);
        assert_eq!(store.session(3).unwrap().query_count, 0);
    }

    #[test]
    fn test_stats_counts_unauthorized_users() {
        let store = SessionStore::new();
        store.touch(1);
        store.check_access(2, "nope", "code");
        store.check_access(3, "code", "code");

        let stats = store.stats(1);
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.your_queries, 0);

        assert_eq!(store.stats(404).your_queries, 0);
    }

    #[tokio::test]
    async fn test_chat_locks_serialize_same_chat() {
        let locks = ChatLocks::new();
        let guard = locks.acquire(1).await;

        // Other chats are not blocked
        let other = locks.acquire(2).await;
        drop(other);

        // Same chat waits for the first guard
        let pending = tokio::time::timeout(std::time::Duration::from_millis(50), locks.acquire(1)).await;
        assert!(pending.is_err());

        drop(guard);
        let _again = locks.acquire(1).await;
    }
}
