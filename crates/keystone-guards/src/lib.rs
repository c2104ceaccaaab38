#![deny(clippy::await_holding_lock)]
//! # Keystone Guards - Layer 4: Enforcement
//!
//! Binds the caller's identity to the logical request and enforces permission
//! requirements before guarded operations run.
//!
//! - [`ExecutionContext`]: task-local session scope, explicit system scope,
//!   and the process-wide [`client`] snapshot
//! - [`AccessChecker`]: resolves the active context and checks a code
//! - [`GuardChain`] / [`Interceptors`]: explicit decorator chains built at startup
//!
//! ```text
//! transport ── lookup ──▶ SessionStore
//!     │
//!     └─ ExecutionContext::scope(session, ...)
//!           └─ Interceptors::invoke("op", handler)
//!                 └─ GuardChain ─▶ AccessChecker ─▶ PermissionSet::check
//! ```

#![forbid(unsafe_code)]

pub mod chain;
pub mod checker;
pub mod client;
pub mod context;
pub mod interceptors;

pub use chain::{Guard, GuardChain, GuardChainBuilder, LicensePolicy};
pub use checker::AccessChecker;
pub use client::ClientSnapshot;
pub use context::{ActiveContext, ExecutionContext};
pub use interceptors::{Interceptors, InterceptorsBuilder};
