//! A small permission tree for tests.
//!
//! ```text
//! PERMISSION_ROOT
//!   └── ORDERS
//!         ├── ORDERS_VIEW
//!         └── ORDERS_EDIT
//!               └── ORDERS_REFUND
//! ```

use keystone_authorization::{PermissionKind, PERMISSION_ROOT};

/// Order management.
pub static ORDERS: PermissionKind = PermissionKind::new(
    &PERMISSION_ROOT,
    "keystone_testkit::kinds::Orders",
    "Orders",
    Some("Order management"),
);

/// View orders.
pub static ORDERS_VIEW: PermissionKind = PermissionKind::new(
    &ORDERS,
    "keystone_testkit::kinds::OrdersView",
    "View",
    None,
);

/// Edit orders.
pub static ORDERS_EDIT: PermissionKind = PermissionKind::new(
    &ORDERS,
    "keystone_testkit::kinds::OrdersEdit",
    "Edit",
    None,
);

/// Refund orders.
pub static ORDERS_REFUND: PermissionKind = PermissionKind::new(
    &ORDERS_EDIT,
    "keystone_testkit::kinds::OrdersRefund",
    "Refund",
    Some("Issue refunds"),
);

/// Every kind declared here, parents first.
pub fn all() -> [&'static PermissionKind; 4] {
    [&ORDERS, &ORDERS_VIEW, &ORDERS_EDIT, &ORDERS_REFUND]
}

/// Code of `kind`; panics if it is not a valid kind.
pub fn code(kind: &PermissionKind) -> String {
    keystone_authorization::code_of(kind)
        .expect("fixture kinds descend from the permission root")
        .to_string()
}
