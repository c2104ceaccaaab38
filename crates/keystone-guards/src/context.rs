//! Ambient execution context.
//!
//! The transport binds the caller's session around each dispatched call and
//! guarded code reads it back without threading it through every signature.
//! The binding is a tokio task-local, so it follows the logical request across
//! `.await` points and worker threads and is never visible to a concurrently
//! dispatched request on the same thread.
//!
//! Resolution order for [`ExecutionContext::active`]:
//!
//! ```text
//! task-local session scope   -> ActiveContext::Session
//! task-local system scope    -> ActiveContext::System
//! client snapshot (process)  -> ActiveContext::Client
//! nothing                    -> ActiveContext::Unbound
//! ```

use crate::client::{self, ClientSnapshot};
use keystone_session::Session;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

#[derive(Clone)]
enum Ambient {
    Session(Arc<Session>),
    System,
}

tokio::task_local! {
    static AMBIENT: Ambient;
}

/// Whichever ambient context is in effect for the caller.
#[derive(Debug, Clone)]
pub enum ActiveContext {
    /// Server role: a session bound to the current request scope. May be the
    /// Empty sentinel if the transport bound "no session" explicitly.
    Session(Arc<Session>),
    /// Explicit internal scope; checks pass.
    System,
    /// Client role: the process-wide login snapshot.
    Client(Arc<ClientSnapshot>),
    /// No context at all.
    Unbound,
}

/// Entry points for binding and reading the ambient context.
pub struct ExecutionContext;

impl ExecutionContext {
    /// Run `future` with `session` bound as the current session.
    pub async fn scope<F>(session: Arc<Session>, future: F) -> F::Output
    where
        F: Future,
    {
        let span = tracing::debug_span!("session", session_id = %session.id());
        AMBIENT
            .scope(Ambient::Session(session), future.instrument(span))
            .await
    }

    /// Run `f` with `session` bound as the current session.
    pub fn sync_scope<R>(session: Arc<Session>, f: impl FnOnce() -> R) -> R {
        AMBIENT.sync_scope(Ambient::Session(session), f)
    }

    /// Spawn `future` on the runtime with `session` bound.
    pub fn spawn<F>(session: Arc<Session>, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(Self::scope(session, future))
    }

    /// Run `f` as trusted internal code: checks pass under every unbound policy.
    ///
    /// Replaces any session bound by an outer scope for the duration of `f`.
    pub fn system_scope<R>(f: impl FnOnce() -> R) -> R {
        AMBIENT.sync_scope(Ambient::System, f)
    }

    /// Async form of [`system_scope`](Self::system_scope).
    pub async fn system_scope_async<F>(future: F) -> F::Output
    where
        F: Future,
    {
        AMBIENT.scope(Ambient::System, future).await
    }

    /// The session bound to the current request, or the Empty sentinel.
    pub fn current_session() -> Arc<Session> {
        AMBIENT
            .try_with(|ambient| match ambient {
                Ambient::Session(session) => Some(Arc::clone(session)),
                Ambient::System => None,
            })
            .ok()
            .flatten()
            .unwrap_or_else(Session::empty)
    }

    /// Whether the caller runs inside [`system_scope`](Self::system_scope).
    pub fn is_system() -> bool {
        matches!(AMBIENT.try_with(|ambient| matches!(ambient, Ambient::System)), Ok(true))
    }

    /// Resolve the ambient context.
    pub fn active() -> ActiveContext {
        if let Ok(ambient) = AMBIENT.try_with(Ambient::clone) {
            return match ambient {
                Ambient::Session(session) => ActiveContext::Session(session),
                Ambient::System => ActiveContext::System,
            };
        }
        match client::current() {
            Some(snapshot) => ActiveContext::Client(snapshot),
            None => ActiveContext::Unbound,
        }
    }
}
