//! Keystone Core - foundation types
//!
//! Shared vocabulary for the session and permission authorization crates:
//!
//! - [`KeystoneError`]: unified infrastructure error type
//! - [`AccessDenied`] / [`AuthorizationFault`]: the only authorization failure channel
//! - [`Clock`] / [`ClientAddressResolver`]: environment interfaces
//! - [`KeystoneConfig`]: TOML + environment configuration
//!
//! # Crate Architecture
//!
//! ```text
//! keystone-core            (errors, faults, clock, config)
//!     ↑
//! keystone-authorization   (PermissionKind, PermissionSet, PermissionRegistry)
//!     ↑
//! keystone-session         (Session, SessionStore, AuthModule)
//!     ↑
//! keystone-guards          (ExecutionContext, AccessChecker, GuardChain)
//! ```

#![forbid(unsafe_code)]

/// Authorization faults
pub mod access;

/// Configuration loading and validation
pub mod config;

/// Clock and client address interfaces
pub mod effects;

/// Unified error handling
pub mod errors;

/// Tracing subscriber bootstrap
pub mod logging;

pub use access::{default_denial_message, AccessDenied, AuthorizationFault};
pub use config::{
    AuthorizationConfig, ConfigValidation, KeystoneConfig, SessionConfig, UnboundPolicy,
};
pub use effects::{ClientAddressResolver, Clock, SystemClock, UnknownClientAddress};
pub use errors::{KeystoneError, Result};
