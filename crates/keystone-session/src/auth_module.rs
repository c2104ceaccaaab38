//! The auth module collaborator.
//!
//! Credential checks and session persistence live outside Keystone. The
//! session layer calls the auth module at create / destroy / traffic-flush
//! boundaries only, never on the permission-check path. Failures are logged
//! by the caller and never roll back the in-memory operation; the one
//! exception is [`AuthModule::approve_session`], which may veto a login
//! before an id is allocated.

use crate::id::SessionId;
use crate::record::{SessionRecord, TrafficReport};
use crate::session::NewSession;
use keystone_core::Result;

/// Persistence and approval hooks provided by the host's auth module.
pub trait AuthModule: Send + Sync {
    /// Approve or veto a login. Called before an id is minted.
    fn approve_session(&self, _request: &NewSession) -> Result<()> {
        Ok(())
    }

    /// Mirror a newly stored session.
    fn persist_session(&self, record: &SessionRecord) -> Result<()>;

    /// Drop the mirror of a removed session.
    fn remove_persisted_session(&self, id: SessionId) -> Result<()>;

    /// Drop every mirrored session.
    fn clear_persisted_sessions(&self) -> Result<()>;

    /// Record traffic accumulated since the last flush.
    fn flush_traffic(&self, report: &TrafficReport) -> Result<()>;

    /// Record the full set of message types a session subscribes to.
    fn persist_message_types(&self, id: SessionId, message_types: &[String]) -> Result<()>;
}
