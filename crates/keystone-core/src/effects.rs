//! Environment interfaces consumed by the session layer.
//!
//! Both are synchronous: nothing in Keystone suspends, and the session layer
//! calls them on create/refresh only.
//!
//! - [`Clock`]: wall-clock UTC time for creation, refresh and expiration stamps
//! - [`ClientAddressResolver`]: the caller's address for `CreatedIP`/`LastAccessedIP`

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Wall-clock time source.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Supplies the address of the client behind the current request.
///
/// Implemented by the transport layer; Keystone only reads it.
pub trait ClientAddressResolver: Send + Sync {
    /// Address of the current caller, or an empty string when unknown.
    fn client_address(&self) -> String;
}

/// Resolver for processes with no transport (tests, offline tools).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownClientAddress;

impl ClientAddressResolver for UnknownClientAddress {
    fn client_address(&self) -> String {
        String::new()
    }
}

impl<F> ClientAddressResolver for F
where
    F: Fn() -> String + Send + Sync,
{
    fn client_address(&self) -> String {
        self()
    }
}
