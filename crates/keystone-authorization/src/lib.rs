//! # Keystone Authorization - Layer 2: Permission Model
//!
//! Hierarchical permission identities and the sets that hold them.
//!
//! - [`PermissionKind`]: a node in the single-rooted tree of checkable capabilities
//! - [`PermissionCode`] / [`code_of`]: stable code derived from a kind's ancestry
//! - [`PermissionSet`]: order- and case-independent set with O(1) identity via [`Thumbprint`]
//! - [`PermissionRegistry`]: process-wide code → [`PermissionDescriptor`] catalog
//!
//! ```text
//! PERMISSION_ROOT
//!   └── Billing            code: 1A2B…
//!         └── Refund       code: 1A2B….9F8E…
//! ```

#![forbid(unsafe_code)]

pub mod code;
pub mod kind;
pub mod reason;
pub mod registry;
pub mod set;

pub use code::{PermissionCode, SEPARATOR};
pub use kind::{code_of, kind_identity, PermissionKind, PERMISSION_ROOT, ROOT_PATH};
pub use reason::{ReasonChain, ReasonProvider};
pub use registry::{PermissionDescriptor, PermissionRegistry};
pub use set::{PermissionSet, Thumbprint};
