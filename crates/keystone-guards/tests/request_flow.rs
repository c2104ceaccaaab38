//! End to end: look up a session, bind it, dispatch through interceptors.

use assert_matches::assert_matches;
use keystone_authorization::PermissionRegistry;
use keystone_core::{AuthorizationFault, KeystoneConfig, UnboundPolicy};
use keystone_guards::{AccessChecker, ExecutionContext, GuardChain, Interceptors, LicensePolicy};
use keystone_session::Session;
use keystone_testkit::{kinds, SessionFixture};
use std::sync::Arc;

fn interceptors(checker: AccessChecker) -> Interceptors {
    let seats: Arc<dyn LicensePolicy> = Arc::new(|session: &Session| {
        if session.product_name() == "Trial" {
            Err("trial licence has no seats left".to_string())
        } else {
            Ok(())
        }
    });
    Interceptors::builder()
        .operation(
            "orders.list",
            GuardChain::builder()
                .named("orders.list")
                .with_checker(checker.clone())
                .require_session()
                .require_kind(&kinds::ORDERS_VIEW)
                .build(),
        )
        .operation(
            "orders.refund",
            GuardChain::builder()
                .named("orders.refund")
                .with_checker(checker.clone())
                .require_session()
                .require_kind(&kinds::ORDERS_REFUND)
                .license(seats)
                .build(),
        )
        .fallback(
            GuardChain::builder()
                .with_checker(checker)
                .require_session()
                .build(),
        )
        .build()
}

fn dispatch(
    fixture: &SessionFixture,
    interceptors: &Interceptors,
    session_id: Option<keystone_session::SessionId>,
    operation: &str,
) -> Result<&'static str, AuthorizationFault> {
    let session = session_id
        .and_then(|id| fixture.store().get(id))
        .unwrap_or_else(Session::empty);
    session.refresh();
    ExecutionContext::sync_scope(session, || interceptors.invoke(operation, || "ok"))
}

#[test]
fn guarded_dispatch_distinguishes_fault_kinds() {
    let config =
        KeystoneConfig::from_toml_str("[authorization]\nunbound_policy = \"deny\"\n").unwrap();
    assert_eq!(config.authorization.unbound_policy, UnboundPolicy::Deny);

    let registry = PermissionRegistry::global();
    registry.register_kinds(&kinds::all()).unwrap();

    let checker = AccessChecker::from_config(&config.authorization).with_global_registry();
    let interceptors = interceptors(checker);
    let fixture = SessionFixture::new();

    let viewer = fixture.login("viewer", &[kinds::code(&kinds::ORDERS_VIEW).as_str()]);
    let refunder = fixture.login(
        "refunder",
        &[
            kinds::code(&kinds::ORDERS_VIEW).as_str(),
            kinds::code(&kinds::ORDERS_REFUND).as_str(),
        ],
    );

    assert_eq!(dispatch(&fixture, &interceptors, Some(viewer.id()), "orders.list"), Ok("ok"));
    assert_eq!(
        dispatch(&fixture, &interceptors, Some(refunder.id()), "orders.refund"),
        Ok("ok")
    );

    let denied =
        dispatch(&fixture, &interceptors, Some(viewer.id()), "orders.refund").unwrap_err();
    assert_eq!(denied.kind(), "access_denied");
    let refund_code = kinds::code(&kinds::ORDERS_REFUND);
    assert_eq!(denied.denied_code(), Some(refund_code.as_str()));
    assert!(denied.to_string().contains("Refund"), "got: {denied}");

    assert_matches!(
        dispatch(&fixture, &interceptors, None, "orders.list"),
        Err(AuthorizationFault::NotLoggedOn)
    );
    assert_matches!(
        dispatch(&fixture, &interceptors, None, "health"),
        Err(AuthorizationFault::NotLoggedOn)
    );
    assert_eq!(dispatch(&fixture, &interceptors, Some(viewer.id()), "health"), Ok("ok"));
}

#[test]
fn licence_exhaustion_is_its_own_fault() {
    let interceptors = interceptors(AccessChecker::default());
    let fixture = SessionFixture::new();
    let refund = kinds::code(&kinds::ORDERS_REFUND);
    let session = Session::create(
        keystone_session::NewSession::new(9, "trial-user")
            .with_product("Trial")
            .with_permissions([refund.as_str()].into_iter().collect()),
        fixture.services(),
    )
    .unwrap();
    fixture.store().add(Arc::clone(&session)).unwrap();

    let fault =
        dispatch(&fixture, &interceptors, Some(session.id()), "orders.refund").unwrap_err();
    assert_matches!(fault, AuthorizationFault::LicenseExhausted { .. });
}

#[test]
fn refresh_on_dispatch_extends_the_session() {
    let interceptors = interceptors(AccessChecker::default());
    let fixture = SessionFixture::new();
    let viewer = fixture.login("viewer", &[kinds::code(&kinds::ORDERS_VIEW).as_str()]);
    let before = viewer.expiration_time();

    fixture.clock().advance_minutes(10);
    dispatch(&fixture, &interceptors, Some(viewer.id()), "orders.list").unwrap();
    assert!(viewer.expiration_time() > before);
}
