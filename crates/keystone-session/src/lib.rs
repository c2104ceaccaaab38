//! # Keystone Session - Layer 3: Sessions
//!
//! Server-side sessions and where they live.
//!
//! - [`Session`]: one authenticated actor with sliding expiration, traffic
//!   counters, message subscriptions and a per-owner [`DataBag`]
//! - [`SessionId`] / [`SessionIdGenerator`]: hard-to-guess, roughly ordered ids
//! - [`SessionStore`]: concurrent id → session map mirrored to the [`AuthModule`]
//!
//! The auth module is consulted only at create / store / remove / flush
//! boundaries. Permission checks never leave memory.

#![forbid(unsafe_code)]

pub mod auth_module;
pub mod data_bag;
pub mod id;
pub mod record;
pub mod session;
pub mod store;

pub use auth_module::AuthModule;
pub use data_bag::DataBag;
pub use id::{SessionId, SessionIdGenerator};
pub use record::{SessionRecord, TrafficReport};
pub use session::{NewSession, Session, SessionServices};
pub use store::SessionStore;
