//! Concurrent session store.
//!
//! Maps session id → `Arc<Session>` and mirrors insertions and removals to
//! the auth module. Insertion is get-or-add and removal is remove-if-present,
//! both atomic with respect to concurrent lookups. Auth module calls happen
//! after the map has been updated and outside any shard lock; their failures
//! are logged and do not undo the in-memory change.
//!
//! Expiration is cooperative: an external sweeper calls
//! [`SessionStore::evict_expired`] on its own schedule.

use crate::auth_module::AuthModule;
use crate::id::SessionId;
use crate::session::Session;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use keystone_core::{KeystoneError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-memory session map bridged to the auth module.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Session>>,
    auth_module: Option<Arc<dyn AuthModule>>,
}

impl SessionStore {
    /// Store without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that mirrors changes to `auth_module`.
    pub fn with_auth_module(auth_module: Arc<dyn AuthModule>) -> Self {
        Self {
            sessions: DashMap::new(),
            auth_module: Some(auth_module),
        }
    }

    /// Return the session stored under `id`, inserting `session` if there is none.
    ///
    /// `id` must be the session's own id, and the Empty session is never stored.
    /// Only an actual insertion is persisted.
    pub fn get_or_add(&self, id: SessionId, session: Arc<Session>) -> Result<Arc<Session>> {
        if session.id() != id {
            return Err(KeystoneError::invalid(format!(
                "session {} cannot be stored under key {id}",
                session.id()
            )));
        }
        if id.is_empty() {
            return Err(KeystoneError::invalid("the Empty session cannot be stored"));
        }

        let stored = match self.sessions.entry(id) {
            Entry::Occupied(existing) => return Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => Arc::clone(slot.insert(session).value()),
        };

        debug!(session_id = %id, login = %stored.login(), "Session stored");
        if let Some(auth_module) = &self.auth_module {
            if let Err(e) = auth_module.persist_session(&stored.to_record()) {
                warn!(session_id = %id, error = %e, "Persisting session failed");
            }
        }
        Ok(stored)
    }

    /// Store `session` under its own id.
    pub fn add(&self, session: Arc<Session>) -> Result<Arc<Session>> {
        self.get_or_add(session.id(), session)
    }

    /// Session stored under `id`.
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the session stored under `id`, if present.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let (_, removed) = self.sessions.remove(&id)?;
        self.removed(&removed);
        Some(removed)
    }

    /// Remove every session.
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        info!(count, "Session store cleared");
        if let Some(auth_module) = &self.auth_module {
            if let Err(e) = auth_module.clear_persisted_sessions() {
                warn!(error = %e, "Clearing persisted sessions failed");
            }
        }
    }

    /// Sessions expired at `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Remove every session expired at `now`; returns the evicted ids.
    ///
    /// A session refreshed between the scan and its removal is kept.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        let mut evicted = Vec::new();
        for candidate in self.expired(now) {
            let id = candidate.id();
            if let Some((_, removed)) = self
                .sessions
                .remove_if(&id, |_, session| session.is_expired(now))
            {
                self.removed(&removed);
                evicted.push(id);
            }
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted expired sessions");
        }
        evicted
    }

    /// Sessions inside the expiration warning window that have not been warned.
    pub fn pending_expiration_warnings(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().needs_expiration_warning(now, window))
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Sessions opened by `login`.
    pub fn find_by_login(&self, login: &str) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().login() == login)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Stored ids.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn removed(&self, session: &Session) {
        debug!(session_id = %session.id(), login = %session.login(), "Session removed");
        if let Some(auth_module) = &self.auth_module {
            if let Err(e) = auth_module.remove_persisted_session(session.id()) {
                warn!(session_id = %session.id(), error = %e, "Removing persisted session failed");
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("auth_module", &self.auth_module.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{NewSession, SessionServices};
    use keystone_core::SessionConfig;

    fn session(login: &str) -> Arc<Session> {
        let services = SessionServices::new(SessionConfig::default());
        Session::create(NewSession::new(1, login), &services).unwrap()
    }

    #[test]
    fn get_or_add_keeps_first_entry() {
        let store = SessionStore::new();
        let first = session("alice");
        let id = first.id();
        let stored = store.get_or_add(id, Arc::clone(&first)).unwrap();
        assert!(Arc::ptr_eq(&stored, &first));

        let again = store.get_or_add(id, Arc::clone(&first)).unwrap();
        assert!(Arc::ptr_eq(&again, &first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn key_must_match_session_id() {
        let store = SessionStore::new();
        let s = session("bob");
        let wrong = SessionId::new(s.id().as_u64().wrapping_add(1));
        assert!(store.get_or_add(wrong, s).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn empty_session_is_never_stored() {
        let store = SessionStore::new();
        assert!(store.add(Session::empty()).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_is_remove_if_present() {
        let store = SessionStore::new();
        let s = session("carol");
        store.add(Arc::clone(&s)).unwrap();
        assert!(store.remove(s.id()).is_some());
        assert!(store.remove(s.id()).is_none());
        assert!(store.get(s.id()).is_none());
    }

    #[test]
    fn lookups() {
        let store = SessionStore::new();
        let a = store.add(session("dave")).unwrap();
        let b = store.add(session("dave")).unwrap();
        store.add(session("erin")).unwrap();

        let mut found: Vec<_> = store.find_by_login("dave").iter().map(|s| s.id()).collect();
        found.sort();
        let mut expected = vec![a.id(), b.id()];
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(store.ids().len(), 3);

        store.clear();
        assert!(store.is_empty());
    }
}
