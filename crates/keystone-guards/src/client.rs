//! Client-role ambient state.
//!
//! A client process holds one permission snapshot, set after login and
//! cleared on logout, plus the id of the last session it logged on with.
//! Reads are lock-free; login and logout swap the whole snapshot.

use arc_swap::ArcSwapOption;
use keystone_authorization::PermissionSet;
use keystone_session::SessionId;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static SNAPSHOT: Lazy<ArcSwapOption<ClientSnapshot>> = Lazy::new(ArcSwapOption::empty);
static LAST_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Permissions granted to this client process by its current login.
#[derive(Debug)]
pub struct ClientSnapshot {
    permissions: PermissionSet,
    session_id: SessionId,
}

impl ClientSnapshot {
    /// Read-only permission set.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Session the snapshot was taken for.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

/// Install the snapshot for a completed login. Replaces any previous one.
pub fn login(permissions: &PermissionSet, session_id: SessionId) {
    SNAPSHOT.store(Some(Arc::new(ClientSnapshot {
        permissions: permissions.read_only_snapshot(),
        session_id,
    })));
    LAST_SESSION_ID.store(session_id.as_u64(), Ordering::SeqCst);
    debug!(session_id = %session_id, codes = permissions.len(), "Client logged on");
}

/// Drop the snapshot. The last session id is kept.
pub fn logout() {
    if let Some(previous) = SNAPSHOT.swap(None) {
        debug!(session_id = %previous.session_id, "Client logged off");
    }
}

/// The active snapshot, if this process is logged on as a client.
pub fn current() -> Option<Arc<ClientSnapshot>> {
    SNAPSHOT.load_full()
}

/// Permissions of the active snapshot.
pub fn current_permissions() -> Option<PermissionSet> {
    SNAPSHOT.load().as_ref().map(|snapshot| snapshot.permissions.clone())
}

/// Id of the most recent login, surviving logout; `None` before the first login.
pub fn last_session_id() -> Option<SessionId> {
    let raw = LAST_SESSION_ID.load(Ordering::SeqCst);
    (raw != 0).then(|| SessionId::new(raw))
}
