//! Process-wide permission catalog.
//!
//! Maps a code to its [`PermissionDescriptor`] for listings and human-readable
//! lookups. Modules register the kinds they declare when they initialize and
//! unregister them when they unload. Registration is idempotent: the first
//! descriptor for a code wins and later ones are ignored.

use crate::code::{normalize, PermissionCode, SEPARATOR};
use crate::kind::{code_of, PermissionKind};
use crate::reason::ReasonProvider;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use keystone_core::{default_denial_message, KeystoneError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

static GLOBAL: Lazy<PermissionRegistry> = Lazy::new(PermissionRegistry::new);

/// Display information for one permission code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDescriptor {
    /// Permission code
    pub code: PermissionCode,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

impl PermissionDescriptor {
    /// Create a descriptor.
    pub fn new(
        code: impl Into<PermissionCode>,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description,
        }
    }

    /// Descriptor for a declared kind.
    pub fn for_kind(kind: &PermissionKind) -> Result<Self> {
        let code = code_of(kind)
            .ok_or_else(|| KeystoneError::invalid_permission_kind(kind.path()))?;
        Ok(Self::new(
            code,
            kind.name(),
            kind.description().map(str::to_string),
        ))
    }

    /// Placeholder used when a code was never registered.
    fn synthesized(code: &str) -> Self {
        Self::new(code, code, None)
    }
}

/// Concurrent code → descriptor catalog.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    descriptors: DashMap<String, PermissionDescriptor>,
}

impl PermissionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static PermissionRegistry {
        &GLOBAL
    }

    /// Register `descriptor`. Returns `false` if its code is already taken; the
    /// existing descriptor is kept.
    pub fn register(&self, descriptor: PermissionDescriptor) -> bool {
        match self.descriptors.entry(descriptor.code.normalized()) {
            Entry::Occupied(existing) => {
                debug!(
                    code = %descriptor.code,
                    existing = %existing.get().name,
                    ignored = %descriptor.name,
                    "Permission already registered, keeping first descriptor"
                );
                false
            }
            Entry::Vacant(slot) => {
                trace!(code = %descriptor.code, name = %descriptor.name, "Registered permission");
                slot.insert(descriptor);
                true
            }
        }
    }

    /// Register a declared kind.
    pub fn register_kind(&self, kind: &PermissionKind) -> Result<bool> {
        Ok(self.register(PermissionDescriptor::for_kind(kind)?))
    }

    /// Register every kind a module declares; returns how many were new.
    pub fn register_kinds(&self, kinds: &[&PermissionKind]) -> Result<usize> {
        let descriptors = kinds
            .iter()
            .map(|kind| PermissionDescriptor::for_kind(kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(descriptors
            .into_iter()
            .filter(|descriptor| self.register(descriptor.clone()))
            .count())
    }

    /// Remove descriptors on module unload.
    ///
    /// An entry is only removed if it is the descriptor being unregistered, so a
    /// module whose registration was ignored cannot evict the winner.
    pub fn unregister_many<'a, I>(&self, descriptors: I)
    where
        I: IntoIterator<Item = &'a PermissionDescriptor>,
    {
        for descriptor in descriptors {
            let removed = self
                .descriptors
                .remove_if(&descriptor.code.normalized(), |_, existing| {
                    existing == descriptor
                });
            if removed.is_some() {
                trace!(code = %descriptor.code, "Unregistered permission");
            }
        }
    }

    /// Unregister the descriptors of declared kinds.
    pub fn unregister_kinds(&self, kinds: &[&PermissionKind]) {
        let descriptors: Vec<_> = kinds
            .iter()
            .filter_map(|kind| PermissionDescriptor::for_kind(kind).ok())
            .collect();
        self.unregister_many(&descriptors);
    }

    /// Descriptor for `code`; synthesizes `{code, name: code}` if unregistered.
    pub fn get(&self, code: &str) -> PermissionDescriptor {
        self.descriptors
            .get(&normalize(code))
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| PermissionDescriptor::synthesized(code))
    }

    /// Whether `code` has a registered descriptor.
    pub fn contains(&self, code: &str) -> bool {
        self.descriptors.contains_key(&normalize(code))
    }

    /// Every registered descriptor, ordered by code.
    pub fn get_permissions(&self) -> Vec<PermissionDescriptor> {
        let mut all: Vec<_> = self
            .descriptors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.code.normalized().cmp(&b.code.normalized()));
        all
    }

    /// Human-readable breadcrumb of a compound code.
    ///
    /// Each prefix level is resolved independently through [`get`](Self::get);
    /// a level that was never registered shows its raw prefix code.
    pub fn get_full_name(&self, code: &str) -> String {
        let names: Vec<String> = PermissionCode::new(code)
            .prefixes()
            .iter()
            .map(|prefix| self.get(prefix.as_str()).name)
            .collect();
        names.join(SEPARATOR)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl ReasonProvider for PermissionRegistry {
    fn denial_reason(&self, code: &str, _culture: Option<&str>) -> Option<String> {
        let descriptor = self.descriptors.get(&normalize(code))?;
        Some(default_denial_message(code, &descriptor.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::PERMISSION_ROOT;

    static BILLING: PermissionKind =
        PermissionKind::new(&PERMISSION_ROOT, "registry_tests::Billing", "Billing", None);
    static REFUND: PermissionKind = PermissionKind::new(
        &BILLING,
        "registry_tests::Refund",
        "Refund",
        Some("Issue refunds"),
    );
    static ORPHAN_ROOT: PermissionKind = PermissionKind::root("registry_tests::Elsewhere");
    static ORPHAN: PermissionKind =
        PermissionKind::new(&ORPHAN_ROOT, "registry_tests::Orphan", "Orphan", None);

    #[test]
    fn first_registration_wins() {
        let registry = PermissionRegistry::new();
        assert!(registry.register(PermissionDescriptor::new("P", "Original", None)));
        assert!(!registry.register(PermissionDescriptor::new("p", "Impostor", None)));
        assert_eq!(registry.get("P").name, "Original");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_code_is_synthesized() {
        let registry = PermissionRegistry::new();
        let descriptor = registry.get("NOPE");
        assert_eq!(descriptor.code.as_str(), "NOPE");
        assert_eq!(descriptor.name, "NOPE");
        assert!(!registry.contains("NOPE"));
    }

    #[test]
    fn full_name_substitutes_raw_prefix_code() {
        let registry = PermissionRegistry::new();
        registry.register(PermissionDescriptor::new("AA", "Root", None));
        registry.register(PermissionDescriptor::new("AA.BB.CC", "Leaf", None));

        assert_eq!(registry.get("AA.BB").name, "AA.BB");
        assert_eq!(registry.get_full_name("AA.BB.CC"), "Root.AA.BB.Leaf");
        assert_eq!(registry.get_full_name("XX.YY"), "XX.XX.YY");
    }

    #[test]
    fn unregister_only_removes_matching_descriptor() {
        let registry = PermissionRegistry::new();
        let winner = PermissionDescriptor::new("P", "Winner", None);
        let loser = PermissionDescriptor::new("P", "Loser", None);
        registry.register(winner.clone());
        registry.register(loser.clone());

        registry.unregister_many([&loser]);
        assert_eq!(registry.get("P").name, "Winner");

        registry.unregister_many([&winner]);
        assert!(registry.is_empty());
    }

    #[test]
    fn kinds_register_and_unregister() {
        let registry = PermissionRegistry::new();
        assert_eq!(registry.register_kinds(&[&BILLING, &REFUND]).unwrap(), 2);
        assert_eq!(registry.register_kinds(&[&BILLING, &REFUND]).unwrap(), 0);

        let refund = code_of(&REFUND).unwrap();
        assert_eq!(registry.get_full_name(refund.as_str()), "Billing.Refund");
        assert_eq!(
            registry.get(refund.as_str()).description.as_deref(),
            Some("Issue refunds")
        );

        registry.unregister_kinds(&[&BILLING, &REFUND]);
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_kind_is_rejected() {
        let registry = PermissionRegistry::new();
        let err = registry.register_kind(&ORPHAN).unwrap_err();
        assert_eq!(
            err,
            KeystoneError::invalid_permission_kind("registry_tests::Orphan")
        );
        assert!(registry.register_kinds(&[&BILLING, &ORPHAN]).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn listing_is_sorted() {
        let registry = PermissionRegistry::new();
        registry.register(PermissionDescriptor::new("b", "B", None));
        registry.register(PermissionDescriptor::new("A", "A", None));
        let codes: Vec<_> = registry
            .get_permissions()
            .into_iter()
            .map(|d| d.code.to_string())
            .collect();
        assert_eq!(codes, ["A", "b"]);
    }

    #[test]
    fn registry_supplies_display_name_reasons() {
        let registry = PermissionRegistry::new();
        registry.register(PermissionDescriptor::new("X1", "Export", None));
        let reason = registry.denial_reason("x1", None).unwrap();
        assert!(reason.contains("Export"), "got: {reason}");
        assert_eq!(registry.denial_reason("UNKNOWN", None), None);
    }
}
