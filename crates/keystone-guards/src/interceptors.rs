//! Startup-built registry of guarded operations.
//!
//! Maps an operation name to the [`GuardChain`] that protects it. The
//! transport dispatches through [`Interceptors::invoke`] instead of calling
//! handlers directly. Operations without a chain of their own use the fallback
//! chain, which requires nothing unless one is configured.

use crate::chain::GuardChain;
use keystone_core::AuthorizationFault;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// Operation name → guard chain, immutable once built.
#[derive(Debug, Clone)]
pub struct Interceptors {
    chains: BTreeMap<String, Arc<GuardChain>>,
    fallback: Arc<GuardChain>,
}

impl Interceptors {
    /// Start building the registry.
    pub fn builder() -> InterceptorsBuilder {
        InterceptorsBuilder::default()
    }

    /// Chain guarding `operation`, or the fallback.
    pub fn chain(&self, operation: &str) -> &GuardChain {
        match self.chains.get(operation) {
            Some(chain) => chain.as_ref(),
            None => {
                trace!(operation, "No guard chain registered, using fallback");
                self.fallback.as_ref()
            }
        }
    }

    /// Whether `operation` has its own chain.
    pub fn contains(&self, operation: &str) -> bool {
        self.chains.contains_key(operation)
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> Vec<&str> {
        self.chains.keys().map(String::as_str).collect()
    }

    /// Run `handler` behind the chain registered for `operation`.
    pub fn invoke<T>(
        &self,
        operation: &str,
        handler: impl FnOnce() -> T,
    ) -> Result<T, AuthorizationFault> {
        self.chain(operation).run(handler)
    }

    /// Async form of [`invoke`](Self::invoke).
    pub async fn invoke_async<F>(
        &self,
        operation: &str,
        handler: F,
    ) -> Result<F::Output, AuthorizationFault>
    where
        F: Future,
    {
        self.chain(operation).run_async(handler).await
    }
}

/// Builder for [`Interceptors`].
#[derive(Default)]
pub struct InterceptorsBuilder {
    chains: BTreeMap<String, Arc<GuardChain>>,
    fallback: Option<GuardChain>,
}

impl InterceptorsBuilder {
    /// Guard `operation` with `chain`. A later registration replaces an earlier one.
    pub fn operation(mut self, operation: impl Into<String>, chain: GuardChain) -> Self {
        self.chains.insert(operation.into(), Arc::new(chain));
        self
    }

    /// Chain for operations registered without one of their own.
    pub fn fallback(mut self, chain: GuardChain) -> Self {
        self.fallback = Some(chain);
        self
    }

    /// Finish the registry.
    pub fn build(self) -> Interceptors {
        Interceptors {
            chains: self.chains,
            fallback: Arc::new(self.fallback.unwrap_or_else(GuardChain::unguarded)),
        }
    }
}
