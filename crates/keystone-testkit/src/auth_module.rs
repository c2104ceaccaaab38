//! Recording auth module.
//!
//! Captures every call the session layer makes so tests can assert on the
//! persistence traffic, and can be told to veto logins or fail calls.

use keystone_core::{KeystoneError, Result};
use keystone_session::{AuthModule, NewSession, SessionId, SessionRecord, TrafficReport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// One call received by [`RecordingAuthModule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthModuleCall {
    /// `approve_session`
    Approve {
        /// Login being approved
        login: String,
    },
    /// `persist_session`
    Persist(SessionRecord),
    /// `remove_persisted_session`
    Remove(SessionId),
    /// `clear_persisted_sessions`
    Clear,
    /// `flush_traffic`
    FlushTraffic(TrafficReport),
    /// `persist_message_types`
    MessageTypes {
        /// Session whose subscriptions changed
        session_id: SessionId,
        /// Full subscription list after the change
        message_types: Vec<String>,
    },
}

/// Auth module double.
#[derive(Debug, Default)]
pub struct RecordingAuthModule {
    calls: Mutex<Vec<AuthModuleCall>>,
    veto: Mutex<Option<String>>,
    failing: AtomicBool,
}

impl RecordingAuthModule {
    /// Module that approves everything and never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Veto every subsequent login with `reason`.
    pub fn veto_logins(&self, reason: impl Into<String>) {
        *self.veto.lock() = Some(reason.into());
    }

    /// Make every persistence call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<AuthModuleCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    /// Ids passed to `persist_session`.
    pub fn persisted(&self) -> Vec<SessionId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                AuthModuleCall::Persist(record) => Some(record.session_id),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `remove_persisted_session`.
    pub fn removed(&self) -> Vec<SessionId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                AuthModuleCall::Remove(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Reports passed to `flush_traffic`.
    pub fn traffic_reports(&self) -> Vec<TrafficReport> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                AuthModuleCall::FlushTraffic(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: AuthModuleCall) -> Result<()> {
        self.calls.lock().push(call);
        if self.failing.load(Ordering::SeqCst) {
            Err(KeystoneError::persistence("auth module unavailable"))
        } else {
            Ok(())
        }
    }
}

impl AuthModule for RecordingAuthModule {
    fn approve_session(&self, request: &NewSession) -> Result<()> {
        self.calls.lock().push(AuthModuleCall::Approve {
            login: request.login.clone(),
        });
        match self.veto.lock().as_ref() {
            Some(reason) => Err(KeystoneError::vetoed(reason.clone())),
            None => Ok(()),
        }
    }

    fn persist_session(&self, record: &SessionRecord) -> Result<()> {
        self.record(AuthModuleCall::Persist(record.clone()))
    }

    fn remove_persisted_session(&self, id: SessionId) -> Result<()> {
        self.record(AuthModuleCall::Remove(id))
    }

    fn clear_persisted_sessions(&self) -> Result<()> {
        self.record(AuthModuleCall::Clear)
    }

    fn flush_traffic(&self, report: &TrafficReport) -> Result<()> {
        self.record(AuthModuleCall::FlushTraffic(report.clone()))
    }

    fn persist_message_types(&self, id: SessionId, message_types: &[String]) -> Result<()> {
        self.record(AuthModuleCall::MessageTypes {
            session_id: id,
            message_types: message_types.to_vec(),
        })
    }
}
