//! Access checks against the ambient context.
//!
//! [`AccessChecker::check`] resolves the active context and delegates to the
//! permission set in effect. The three failure conditions stay distinct in
//! [`AuthorizationFault`]; everything else about the permission set stays
//! private to the checker.
//!
//! With no context active the decision falls to [`UnboundPolicy`]. `Allow`
//! passes (logged at trace) and `Deny` reports [`AuthorizationFault::NotLoggedOn`],
//! in which case internal callers must enter
//! [`ExecutionContext::system_scope`](crate::ExecutionContext::system_scope).

use crate::context::{ActiveContext, ExecutionContext};
use keystone_authorization::{
    code_of, PermissionKind, PermissionRegistry, PermissionSet, ReasonProvider,
};
use keystone_core::{AuthorizationConfig, AuthorizationFault, UnboundPolicy};
use keystone_session::Session;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Checks required permission codes against the ambient context.
#[derive(Clone, Default)]
pub struct AccessChecker {
    policy: UnboundPolicy,
    reasons: Option<Arc<dyn ReasonProvider>>,
}

impl AccessChecker {
    /// Checker with the given unbound policy and default denial messages.
    pub fn new(policy: UnboundPolicy) -> Self {
        Self {
            policy,
            reasons: None,
        }
    }

    /// Checker configured from the `[authorization]` table.
    pub fn from_config(config: &AuthorizationConfig) -> Self {
        Self::new(config.unbound_policy)
    }

    /// Ask `provider` for denial messages.
    pub fn with_reason_provider(mut self, provider: Arc<dyn ReasonProvider>) -> Self {
        self.reasons = Some(provider);
        self
    }

    /// Word denial messages with display names from the global registry.
    pub fn with_global_registry(self) -> Self {
        self.with_reason_provider(Arc::new(|code: &str, culture: Option<&str>| {
            PermissionRegistry::global().denial_reason(code, culture)
        }))
    }

    /// Unbound policy in effect.
    pub fn policy(&self) -> UnboundPolicy {
        self.policy
    }

    /// Require `code` from whichever context is active.
    pub fn check(&self, code: &str) -> Result<(), AuthorizationFault> {
        match ExecutionContext::active() {
            ActiveContext::Session(session) => self.check_session(&session, code),
            ActiveContext::Client(snapshot) => self.check_set(snapshot.permissions(), code, None),
            ActiveContext::System => {
                trace!(code, "System scope, check passes");
                Ok(())
            }
            ActiveContext::Unbound => self.unbound(code),
        }
    }

    /// Require the code of a declared kind.
    ///
    /// A kind outside the permission tree has no code; the check then uses
    /// its path as an opaque code, which no real set contains.
    pub fn check_kind(&self, kind: &PermissionKind) -> Result<(), AuthorizationFault> {
        match code_of(kind) {
            Some(code) => self.check(code.as_str()),
            None => {
                error!(
                    path = kind.path(),
                    "Permission kind does not descend from the permission root"
                );
                self.check(kind.path())
            }
        }
    }

    /// Require at least one of `codes`. An empty list requires nothing.
    ///
    /// A denial names the first code.
    pub fn check_any<S: AsRef<str>>(&self, codes: &[S]) -> Result<(), AuthorizationFault> {
        let Some(first) = codes.first() else {
            return Ok(());
        };
        let first = first.as_ref();
        match ExecutionContext::active() {
            ActiveContext::Session(session) => {
                self.require_logged_on(&session)?;
                if codes.iter().any(|code| session.permissions().contains(code)) {
                    return Ok(());
                }
                self.check_set(session.permissions(), first, session.culture_opt())
            }
            ActiveContext::Client(snapshot) => {
                if codes.iter().any(|code| snapshot.permissions().contains(code)) {
                    return Ok(());
                }
                self.check_set(snapshot.permissions(), first, None)
            }
            ActiveContext::System => Ok(()),
            ActiveContext::Unbound => self.unbound(first),
        }
    }

    /// Require `code` from `session` directly, bypassing the ambient lookup.
    pub fn check_session(&self, session: &Session, code: &str) -> Result<(), AuthorizationFault> {
        self.require_logged_on(session)?;
        self.check_set(session.permissions(), code, session.culture_opt())
            .map_err(|fault| {
                debug!(session_id = %session.id(), login = %session.login(), code, "Access denied");
                fault
            })
    }

    /// The bound session, or `NotLoggedOn` when there is none.
    pub fn require_session(&self) -> Result<Arc<Session>, AuthorizationFault> {
        match ExecutionContext::active() {
            ActiveContext::Session(session) if !session.is_empty() => Ok(session),
            _ => {
                debug!("Session required but none is bound");
                Err(AuthorizationFault::NotLoggedOn)
            }
        }
    }

    fn require_logged_on(&self, session: &Session) -> Result<(), AuthorizationFault> {
        if session.is_empty() {
            debug!("Empty session bound, not logged on");
            return Err(AuthorizationFault::NotLoggedOn);
        }
        Ok(())
    }

    fn check_set(
        &self,
        permissions: &PermissionSet,
        code: &str,
        culture: Option<&str>,
    ) -> Result<(), AuthorizationFault> {
        permissions
            .check_localized(code, self.reasons.as_deref(), culture)
            .map_err(AuthorizationFault::from)
    }

    fn unbound(&self, code: &str) -> Result<(), AuthorizationFault> {
        match self.policy {
            UnboundPolicy::Allow => {
                trace!(code, "No ambient context, allowed by policy");
                Ok(())
            }
            UnboundPolicy::Deny => {
                debug!(code, "No ambient context, denied by policy");
                Err(AuthorizationFault::NotLoggedOn)
            }
        }
    }
}

impl fmt::Debug for AccessChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessChecker")
            .field("policy", &self.policy)
            .field("reasons", &self.reasons.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use keystone_authorization::PERMISSION_ROOT;
    use keystone_core::SessionConfig;
    use keystone_session::{NewSession, SessionServices};

    static STRAY_ROOT: PermissionKind = PermissionKind::root("checker_tests::Elsewhere");
    static STRAY: PermissionKind =
        PermissionKind::new(&STRAY_ROOT, "checker_tests::Stray", "Stray", None);
    static EXPORT: PermissionKind =
        PermissionKind::new(&PERMISSION_ROOT, "checker_tests::Export", "Export", None);

    fn session(codes: &[&str]) -> Arc<Session> {
        Session::create(
            NewSession::new(1, "alice")
                .with_permissions(PermissionSet::from_codes(codes.iter().copied()))
                .with_culture("de-DE"),
            &SessionServices::new(SessionConfig::default()),
        )
        .unwrap()
    }

    #[test]
    fn bound_session_is_checked() {
        let checker = AccessChecker::default();
        ExecutionContext::sync_scope(session(&["A", "B"]), || {
            assert!(checker.check("a").is_ok());
            let fault = checker.check("C").unwrap_err();
            assert_eq!(fault.denied_code(), Some("C"));
            assert_eq!(fault.kind(), "access_denied");
        });
    }

    #[test]
    fn empty_session_is_not_logged_on() {
        let checker = AccessChecker::default();
        ExecutionContext::sync_scope(Session::empty(), || {
            assert_matches!(checker.check("A"), Err(AuthorizationFault::NotLoggedOn));
            assert_matches!(checker.require_session(), Err(AuthorizationFault::NotLoggedOn));
        });
    }

    #[test]
    fn unbound_follows_policy() {
        assert!(AccessChecker::new(UnboundPolicy::Allow).check("A").is_ok());
        let deny = AccessChecker::new(UnboundPolicy::Deny);
        assert_matches!(deny.check("A"), Err(AuthorizationFault::NotLoggedOn));
        assert!(ExecutionContext::system_scope(|| deny.check("A")).is_ok());
    }

    #[test]
    fn reason_provider_sees_session_culture() {
        let checker = AccessChecker::default().with_reason_provider(Arc::new(
            |code: &str, culture: Option<&str>| Some(format!("{code}:{}", culture.unwrap_or("-"))),
        ));
        ExecutionContext::sync_scope(session(&[]), || {
            let fault = checker.check("X").unwrap_err();
            assert_eq!(fault.to_string(), "X:de-DE");
        });
    }

    #[test]
    fn check_any_passes_on_one_match() {
        let checker = AccessChecker::default();
        ExecutionContext::sync_scope(session(&["B"]), || {
            assert!(checker.check_any(&["A", "B"]).is_ok());
            assert_eq!(
                checker.check_any(&["C", "D"]).unwrap_err().denied_code(),
                Some("C")
            );
            assert!(checker.check_any::<&str>(&[]).is_ok());
        });
    }

    #[test]
    fn kinds_resolve_to_codes() {
        let checker = AccessChecker::default();
        let export = code_of(&EXPORT).unwrap();
        ExecutionContext::sync_scope(session(&[export.as_str()]), || {
            assert!(checker.check_kind(&EXPORT).is_ok());
            assert_eq!(
                checker.check_kind(&STRAY).unwrap_err().denied_code(),
                Some("checker_tests::Stray")
            );
        });
    }
}
