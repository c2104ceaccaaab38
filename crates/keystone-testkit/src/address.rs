//! Client address double.

use keystone_core::ClientAddressResolver;
use parking_lot::RwLock;
use std::sync::Arc;

/// Address resolver whose answer tests can change between requests.
#[derive(Debug, Clone)]
pub struct SettableAddress {
    address: Arc<RwLock<String>>,
}

impl SettableAddress {
    /// Resolver answering `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Arc::new(RwLock::new(address.into())),
        }
    }

    /// Change the answer.
    pub fn set(&self, address: impl Into<String>) {
        *self.address.write() = address.into();
    }
}

impl ClientAddressResolver for SettableAddress {
    fn client_address(&self) -> String {
        self.address.read().clone()
    }
}
