//! Keystone Testing Infrastructure
//!
//! Test doubles for the collaborators a session needs, plus fixtures that
//! wire them together so test modules do not repeat the setup.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! keystone-testkit = { workspace = true }
//! ```
//!
//! ```rust,no_run
//! use keystone_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     let fixture = SessionFixture::new();
//!     let session = fixture.login("alice", &["A", "B"]);
//!     fixture.clock().advance_minutes(5);
//!     session.refresh();
//! }
//! ```

pub mod address;
pub mod auth_module;
pub mod clock;
pub mod fixtures;
pub mod kinds;

pub use address::SettableAddress;
pub use auth_module::{AuthModuleCall, RecordingAuthModule};
pub use clock::ManualClock;
pub use fixtures::{init_test_tracing, SessionFixture};
