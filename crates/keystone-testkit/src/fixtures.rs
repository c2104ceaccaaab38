//! Pre-wired session services for tests.

use crate::address::SettableAddress;
use crate::auth_module::RecordingAuthModule;
use crate::clock::ManualClock;
use keystone_authorization::PermissionSet;
use keystone_core::SessionConfig;
use keystone_session::{NewSession, Session, SessionIdGenerator, SessionServices, SessionStore};
use std::sync::Arc;

/// Install a test-writer tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Manual clock, settable address, recording auth module and a store that
/// mirrors into it.
pub struct SessionFixture {
    clock: ManualClock,
    address: SettableAddress,
    auth_module: Arc<RecordingAuthModule>,
    services: SessionServices,
    store: SessionStore,
}

impl SessionFixture {
    /// Fixture with the default session settings.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Fixture with custom session settings.
    pub fn with_config(config: SessionConfig) -> Self {
        init_test_tracing();
        let clock = ManualClock::at_noon();
        let address = SettableAddress::new("192.0.2.1");
        let auth_module = Arc::new(RecordingAuthModule::new());
        let services = SessionServices::new(config)
            .with_clock(Arc::new(clock.clone()))
            .with_client_address(Arc::new(address.clone()))
            .with_auth_module(auth_module.clone())
            .with_id_generator(Arc::new(SessionIdGenerator::new()));
        let store = SessionStore::with_auth_module(auth_module.clone());
        Self {
            clock,
            address,
            auth_module,
            services,
            store,
        }
    }

    /// The manual clock behind the services.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// The client address behind the services.
    pub fn address(&self) -> &SettableAddress {
        &self.address
    }

    /// The recording auth module.
    pub fn auth_module(&self) -> &RecordingAuthModule {
        &self.auth_module
    }

    /// Services to pass to [`Session::create`].
    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    /// Store mirrored into the recording auth module.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Create a session holding `codes` without storing it.
    pub fn session(&self, login: &str, codes: &[&str]) -> Arc<Session> {
        Session::create(
            NewSession::new(1, login)
                .with_permissions(PermissionSet::from_codes(codes.iter().copied())),
            &self.services,
        )
        .unwrap()
    }

    /// Create a session holding `codes` and add it to the store.
    pub fn login(&self, login: &str, codes: &[&str]) -> Arc<Session> {
        let session = self.session(login, codes);
        self.store.add(session).unwrap()
    }
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}
