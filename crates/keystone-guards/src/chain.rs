//! Guard chains: explicit decorators around guarded operations.
//!
//! A [`GuardChain`] is built once at startup from a list of requirements and
//! evaluated in order before the operation it protects runs. The first failing
//! requirement short-circuits with its [`AuthorizationFault`]; the operation
//! is never entered.
//!
//! ```text
//! require_session → require(code) … → license(policy) → guard(custom) → operation
//! ```
//!
//! Session and licence requirements need a logged-on server session; inside
//! a system scope they pass like every other check.

use crate::checker::AccessChecker;
use crate::context::ExecutionContext;
use keystone_authorization::{PermissionCode, PermissionKind};
use keystone_core::AuthorizationFault;
use keystone_session::Session;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

/// Custom requirement evaluated against the ambient context.
pub trait Guard: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Pass, or fail with the fault the transport should see.
    fn evaluate(&self, checker: &AccessChecker) -> Result<(), AuthorizationFault>;
}

/// Account or licence capacity check for a logged-on session.
pub trait LicensePolicy: Send + Sync {
    /// `Err(reason)` when the session's account has no remaining capacity.
    fn admit(&self, session: &Session) -> Result<(), String>;
}

impl<F> LicensePolicy for F
where
    F: Fn(&Session) -> Result<(), String> + Send + Sync,
{
    fn admit(&self, session: &Session) -> Result<(), String> {
        self(session)
    }
}

#[derive(Clone)]
enum Requirement {
    Session,
    Code(PermissionCode),
    Kind(&'static PermissionKind),
    Any(Vec<PermissionCode>),
    License(Arc<dyn LicensePolicy>),
    Custom(Arc<dyn Guard>),
}

impl Requirement {
    fn describe(&self) -> String {
        match self {
            Requirement::Session => "session".to_string(),
            Requirement::Code(code) => format!("code:{code}"),
            Requirement::Kind(kind) => format!("kind:{}", kind.path()),
            Requirement::Any(codes) => format!(
                "any:[{}]",
                codes.iter().map(PermissionCode::as_str).collect::<Vec<_>>().join(",")
            ),
            Requirement::License(_) => "license".to_string(),
            Requirement::Custom(guard) => format!("guard:{}", guard.name()),
        }
    }

    fn evaluate(&self, checker: &AccessChecker) -> Result<(), AuthorizationFault> {
        match self {
            Requirement::Session | Requirement::License(_) if ExecutionContext::is_system() => {
                Ok(())
            }
            Requirement::Session => checker.require_session().map(|_| ()),
            Requirement::Code(code) => checker.check(code.as_str()),
            Requirement::Kind(kind) => checker.check_kind(kind),
            Requirement::Any(codes) => checker.check_any(codes),
            Requirement::License(policy) => {
                let session = checker.require_session()?;
                policy
                    .admit(&session)
                    .map_err(AuthorizationFault::license_exhausted)
            }
            Requirement::Custom(guard) => guard.evaluate(checker),
        }
    }
}

/// Ordered requirements evaluated before a guarded operation.
#[derive(Clone)]
pub struct GuardChain {
    name: String,
    checker: AccessChecker,
    requirements: Vec<Requirement>,
}

impl GuardChain {
    /// Start building a chain.
    pub fn builder() -> GuardChainBuilder {
        GuardChainBuilder::default()
    }

    /// A chain with no requirements.
    pub fn unguarded() -> Self {
        Self::builder().build()
    }

    /// Operation name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of requirements.
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the chain requires nothing.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate every requirement in order against the ambient context.
    pub fn evaluate(&self) -> Result<(), AuthorizationFault> {
        for requirement in &self.requirements {
            if let Err(fault) = requirement.evaluate(&self.checker) {
                debug!(
                    operation = %self.name,
                    requirement = %requirement.describe(),
                    fault = fault.kind(),
                    "Guard chain rejected call"
                );
                return Err(fault);
            }
        }
        trace!(
            operation = %self.name,
            requirements = self.requirements.len(),
            "Guard chain passed"
        );
        Ok(())
    }

    /// Evaluate the chain, then run `operation`.
    pub fn run<T>(&self, operation: impl FnOnce() -> T) -> Result<T, AuthorizationFault> {
        self.evaluate()?;
        Ok(operation())
    }

    /// Evaluate the chain, then drive `operation` to completion.
    ///
    /// The chain is evaluated when the returned future is first polled, so it
    /// sees the scope the future runs in.
    pub async fn run_async<F>(&self, operation: F) -> Result<F::Output, AuthorizationFault>
    where
        F: Future,
    {
        self.evaluate()?;
        Ok(operation.await)
    }
}

impl fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardChain")
            .field("name", &self.name)
            .field(
                "requirements",
                &self.requirements.iter().map(Requirement::describe).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`GuardChain`].
#[derive(Default)]
pub struct GuardChainBuilder {
    name: Option<String>,
    checker: Option<AccessChecker>,
    requirements: Vec<Requirement>,
}

impl GuardChainBuilder {
    /// Name the guarded operation for logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checker used by every requirement; the default allows unbound callers.
    pub fn with_checker(mut self, checker: AccessChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Require a logged-on session.
    pub fn require_session(mut self) -> Self {
        self.requirements.push(Requirement::Session);
        self
    }

    /// Require a permission code.
    pub fn require(mut self, code: impl Into<PermissionCode>) -> Self {
        self.requirements.push(Requirement::Code(code.into()));
        self
    }

    /// Require the code of a declared kind.
    pub fn require_kind(mut self, kind: &'static PermissionKind) -> Self {
        self.requirements.push(Requirement::Kind(kind));
        self
    }

    /// Require at least one of `codes`.
    pub fn require_any<I, C>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        self.requirements
            .push(Requirement::Any(codes.into_iter().map(Into::into).collect()));
        self
    }

    /// Require the session's account to pass `policy`.
    pub fn license(mut self, policy: Arc<dyn LicensePolicy>) -> Self {
        self.requirements.push(Requirement::License(policy));
        self
    }

    /// Add a custom guard.
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.requirements.push(Requirement::Custom(guard));
        self
    }

    /// Finish the chain.
    pub fn build(self) -> GuardChain {
        GuardChain {
            name: self.name.unwrap_or_else(|| "unnamed".to_string()),
            checker: self.checker.unwrap_or_default(),
            requirements: self.requirements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use keystone_authorization::PermissionSet;
    use keystone_core::{SessionConfig, UnboundPolicy};
    use keystone_session::{NewSession, SessionServices};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn session(login: &str, codes: &[&str]) -> Arc<Session> {
        Session::create(
            NewSession::new(1, login)
                .with_permissions(PermissionSet::from_codes(codes.iter().copied())),
            &SessionServices::new(SessionConfig::default()),
        )
        .unwrap()
    }

    struct Weekday(bool);

    impl Guard for Weekday {
        fn name(&self) -> &str {
            "weekday"
        }

        fn evaluate(&self, _checker: &AccessChecker) -> Result<(), AuthorizationFault> {
            if self.0 {
                Ok(())
            } else {
                Err(AuthorizationFault::license_exhausted("closed today"))
            }
        }
    }

    #[test]
    fn operation_runs_only_when_chain_passes() {
        let chain = GuardChain::builder().named("orders.edit").require("EDIT").build();
        let ran = AtomicBool::new(false);

        let denied = ExecutionContext::sync_scope(session("reader", &["VIEW"]), || {
            chain.run(|| ran.store(true, Ordering::SeqCst))
        });
        assert_eq!(denied.unwrap_err().denied_code(), Some("EDIT"));
        assert!(!ran.load(Ordering::SeqCst));

        ExecutionContext::sync_scope(session("editor", &["EDIT"]), || {
            chain.run(|| ran.store(true, Ordering::SeqCst))
        })
        .unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn requirements_short_circuit_in_order() {
        let chain = GuardChain::builder()
            .require_session()
            .require("A")
            .guard(Arc::new(Weekday(false)))
            .build();
        assert_eq!(chain.len(), 3);

        assert_matches!(chain.evaluate(), Err(AuthorizationFault::NotLoggedOn));
        ExecutionContext::sync_scope(session("alice", &[]), || {
            assert_matches!(chain.evaluate(), Err(AuthorizationFault::AccessDenied(_)));
        });
        ExecutionContext::sync_scope(session("alice", &["A"]), || {
            assert_matches!(
                chain.evaluate(),
                Err(AuthorizationFault::LicenseExhausted { .. })
            );
        });
    }

    #[test]
    fn license_policy_sees_session() {
        let policy: Arc<dyn LicensePolicy> = Arc::new(|session: &Session| {
            if session.login() == "trial" {
                Err("trial seats used up".to_string())
            } else {
                Ok(())
            }
        });
        let chain = GuardChain::builder().license(policy).build();

        ExecutionContext::sync_scope(session("trial", &[]), || {
            let fault = chain.evaluate().unwrap_err();
            assert_eq!(fault.kind(), "license_exhausted");
            assert!(fault.to_string().contains("trial seats used up"));
        });
        ExecutionContext::sync_scope(session("paid", &[]), || {
            assert!(chain.evaluate().is_ok());
        });
    }

    #[test]
    fn unguarded_chain_always_runs() {
        let chain = GuardChain::unguarded();
        assert!(chain.is_empty());
        assert_eq!(chain.run(|| 7).unwrap(), 7);
    }

    #[test]
    fn chain_uses_configured_checker() {
        let chain = GuardChain::builder()
            .with_checker(AccessChecker::new(UnboundPolicy::Deny))
            .require("A")
            .build();
        assert_matches!(chain.run(|| ()), Err(AuthorizationFault::NotLoggedOn));
        assert!(ExecutionContext::system_scope(|| chain.run(|| ())).is_ok());
    }

    #[tokio::test]
    async fn async_operation_is_gated() {
        let chain = GuardChain::builder().require_any(["A", "B"]).build();
        let result = ExecutionContext::scope(session("alice", &["b"]), async {
            chain.run_async(async { "done" }).await
        })
        .await;
        assert_eq!(result.unwrap(), "done");
    }
}
