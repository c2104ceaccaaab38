//! Permission kinds and their hierarchical codes.
//!
//! A permission kind is a node in a single-rooted tree of checkable
//! capabilities. Modules declare kinds as statics:
//!
//! ```rust
//! use keystone_authorization::{code_of, PermissionKind, PERMISSION_ROOT};
//!
//! static ADMIN: PermissionKind =
//!     PermissionKind::new(&PERMISSION_ROOT, "acme::perms::Admin", "Administrator", None);
//! static SUPER_ADMIN: PermissionKind =
//!     PermissionKind::new(&ADMIN, "acme::perms::SuperAdmin", "Super administrator", None);
//!
//! let admin = code_of(&ADMIN).unwrap();
//! let super_admin = code_of(&SUPER_ADMIN).unwrap();
//! assert!(super_admin.is_descendant_of(&admin));
//! ```
//!
//! The identity of a kind is derived from its fully-qualified path only, so a
//! code is reproducible across builds and restarts of the same binary.

use crate::code::{PermissionCode, SEPARATOR};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

/// Fully-qualified path of the permission root.
pub const ROOT_PATH: &str = "keystone::Permission";

/// The root every checkable permission kind descends from.
pub static PERMISSION_ROOT: PermissionKind = PermissionKind::root(ROOT_PATH);

/// Number of digest bytes kept for a kind identity (rendered as 16 hex digits).
const IDENTITY_BYTES: usize = 8;

/// A node in the permission kind tree.
#[derive(Debug)]
pub struct PermissionKind {
    path: &'static str,
    parent: Option<&'static PermissionKind>,
    name: &'static str,
    description: Option<&'static str>,
    identifiable: bool,
    code: OnceCell<Option<PermissionCode>>,
}

impl PermissionKind {
    /// Declare a tree root. Only [`PERMISSION_ROOT`] yields codes; other roots
    /// exist so foreign hierarchies can be rejected rather than mistaken for ours.
    pub const fn root(path: &'static str) -> Self {
        Self {
            path,
            parent: None,
            name: path,
            description: None,
            identifiable: false,
            code: OnceCell::new(),
        }
    }

    /// Declare an independently identifiable kind under `parent`.
    pub const fn new(
        parent: &'static PermissionKind,
        path: &'static str,
        name: &'static str,
        description: Option<&'static str>,
    ) -> Self {
        Self {
            path,
            parent: Some(parent),
            name,
            description,
            identifiable: true,
            code: OnceCell::new(),
        }
    }

    /// Declare a grouping kind. It contributes a segment to its descendants'
    /// codes but cannot be checked or registered itself.
    pub const fn abstract_kind(
        parent: &'static PermissionKind,
        path: &'static str,
        name: &'static str,
    ) -> Self {
        Self {
            path,
            parent: Some(parent),
            name,
            description: None,
            identifiable: false,
            code: OnceCell::new(),
        }
    }

    /// Fully-qualified path.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Optional description.
    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Parent kind, `None` for roots.
    pub fn parent(&self) -> Option<&'static PermissionKind> {
        self.parent
    }

    /// Whether this kind can be checked on its own.
    pub fn is_identifiable(&self) -> bool {
        self.identifiable
    }

    /// Whether this is the canonical permission root.
    pub fn is_permission_root(&self) -> bool {
        self.parent.is_none() && self.path == ROOT_PATH
    }

    /// Stable identity of this kind.
    pub fn identity(&self) -> String {
        kind_identity(self.path)
    }

    /// Whether the ancestor chain ends at [`PERMISSION_ROOT`].
    pub fn descends_from_root(&self) -> bool {
        let mut current = self;
        while let Some(parent) = current.parent {
            if parent.is_permission_root() {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Whether `ancestor` appears anywhere above this kind.
    pub fn is_subkind_of(&self, ancestor: &PermissionKind) -> bool {
        let mut current = self.parent;
        while let Some(kind) = current {
            if kind.path == ancestor.path {
                return true;
            }
            current = kind.parent;
        }
        false
    }

    /// Ancestor chain from the root (exclusive) to this kind (inclusive).
    fn lineage(&self) -> Vec<&PermissionKind> {
        let mut chain = vec![self];
        let mut current = self.parent;
        while let Some(kind) = current {
            if kind.parent.is_none() {
                break;
            }
            chain.push(kind);
            current = kind.parent;
        }
        chain.reverse();
        chain
    }
}

/// Identity of a kind: SHA-256 over its fully-qualified path, truncated and
/// rendered as uppercase hex.
pub fn kind_identity(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    hex::encode_upper(&digest[..IDENTITY_BYTES])
}

/// Hierarchical code of `kind`, or `None` if the kind does not descend from
/// [`PERMISSION_ROOT`] or is not independently identifiable.
///
/// Memoized per kind.
pub fn code_of(kind: &PermissionKind) -> Option<PermissionCode> {
    kind.code
        .get_or_init(|| {
            if !kind.identifiable || !kind.descends_from_root() {
                return None;
            }
            let segments: Vec<String> = kind.lineage().iter().map(|k| k.identity()).collect();
            Some(PermissionCode::new(segments.join(SEPARATOR)))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    static ADMIN: PermissionKind =
        PermissionKind::new(&PERMISSION_ROOT, "tests::Admin", "Administrator", None);
    static SUPER_ADMIN: PermissionKind = PermissionKind::new(
        &ADMIN,
        "tests::SuperAdmin",
        "Super administrator",
        Some("Everything an administrator can do, and more"),
    );
    static REPORTS: PermissionKind =
        PermissionKind::abstract_kind(&PERMISSION_ROOT, "tests::Reports", "Reports");
    static EXPORT_REPORTS: PermissionKind =
        PermissionKind::new(&REPORTS, "tests::ExportReports", "Export reports", None);

    static FOREIGN_ROOT: PermissionKind = PermissionKind::root("other::Root");
    static FOREIGN: PermissionKind =
        PermissionKind::new(&FOREIGN_ROOT, "other::Thing", "Thing", None);

    #[test]
    fn identity_is_hex_of_fixed_width() {
        let id = kind_identity("tests::Admin");
        assert_eq!(id.len(), IDENTITY_BYTES * 2);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(id, kind_identity("tests::Admin"));
        assert_ne!(id, kind_identity("tests::admin"));
    }

    #[test]
    fn code_is_memoized_and_stable() {
        let first = code_of(&SUPER_ADMIN).unwrap();
        let second = code_of(&SUPER_ADMIN).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.as_str(),
            format!(
                "{}{SEPARATOR}{}",
                kind_identity("tests::Admin"),
                kind_identity("tests::SuperAdmin")
            )
        );
    }

    #[test]
    fn identities_are_pinned() {
        assert_eq!(kind_identity(ROOT_PATH), "9B02B653EB693527");
        assert_eq!(kind_identity("tests::Admin"), "E0C48EDED84A48D5");
        assert_eq!(
            code_of(&SUPER_ADMIN).unwrap().as_str(),
            "E0C48EDED84A48D5.E80B20CE101EFD15"
        );
    }

    #[test]
    fn subkind_code_extends_parent_code() {
        let admin = code_of(&ADMIN).unwrap();
        let super_admin = code_of(&SUPER_ADMIN).unwrap();
        assert!(super_admin.is_descendant_of(&admin));
        assert!(!admin.is_descendant_of(&super_admin));
        assert_eq!(super_admin.depth(), 2);
    }

    #[test]
    fn abstract_kind_has_no_code_but_contributes_segment() {
        assert!(code_of(&REPORTS).is_none());
        let export = code_of(&EXPORT_REPORTS).unwrap();
        assert_eq!(export.segments().next(), Some(kind_identity("tests::Reports").as_str()));
    }

    #[test]
    fn foreign_hierarchy_and_root_have_no_code() {
        assert!(code_of(&FOREIGN).is_none());
        assert!(code_of(&FOREIGN_ROOT).is_none());
        assert!(code_of(&PERMISSION_ROOT).is_none());
        assert!(!FOREIGN.descends_from_root());
    }

    #[test]
    fn subkind_relation() {
        assert!(SUPER_ADMIN.is_subkind_of(&ADMIN));
        assert!(SUPER_ADMIN.is_subkind_of(&PERMISSION_ROOT));
        assert!(!ADMIN.is_subkind_of(&SUPER_ADMIN));
    }
}
