//! Order-independent, case-insensitive permission sets.
//!
//! Identity is the [`Thumbprint`]: every code uppercased, sorted, joined and
//! hashed. Two sets with the same members in any order or case compare equal
//! and hash alike, so a set can be compared in O(1) once built.
//!
//! ## Concurrency
//!
//! Contents live in an immutable snapshot behind an [`ArcSwap`]; readers load
//! it without locking. Writers serialize on a `parking_lot::Mutex`, build the
//! next snapshot (thumbprint included) and publish it, so a reader never
//! observes members and thumbprint out of step.

use crate::code::{is_descendant, normalize, PermissionCode};
use crate::reason::ReasonProvider;
use arc_swap::ArcSwap;
use keystone_core::{default_denial_message, AccessDenied};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Byte placed between codes before hashing so `{"AB"}` and `{"A","B"}` differ.
const THUMBPRINT_DELIMITER: u8 = 0x1f;

/// Canonical SHA-256 hash of a permission set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Thumbprint([u8; 32]);

impl Thumbprint {
    /// Compute the thumbprint of already-normalized, sorted codes.
    fn of_sorted<'a>(codes: impl Iterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for (index, code) in codes.enumerate() {
            if index > 0 {
                hasher.update([THUMBPRINT_DELIMITER]);
            }
            hasher.update(code.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Uppercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Immutable contents of a set at one point in time.
#[derive(Debug)]
struct Snapshot {
    /// Normalized code -> code as first supplied.
    codes: BTreeMap<String, PermissionCode>,
    thumbprint: Thumbprint,
}

impl Snapshot {
    fn new(codes: BTreeMap<String, PermissionCode>) -> Self {
        let thumbprint = Thumbprint::of_sorted(codes.keys().map(String::as_str));
        Self { codes, thumbprint }
    }
}

/// A set of permission codes held by a session or a client process.
pub struct PermissionSet {
    snapshot: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
    read_only: bool,
}

impl PermissionSet {
    /// Empty mutable set.
    pub fn new() -> Self {
        Self::build(BTreeMap::new(), false)
    }

    /// Mutable set holding `codes`.
    pub fn from_codes<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self::build(collect(codes), false)
    }

    /// Read-only set holding `codes`. Mutation calls on it are silent no-ops.
    pub fn read_only<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self::build(collect(codes), true)
    }

    fn build(codes: BTreeMap<String, PermissionCode>, read_only: bool) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::new(codes)),
            write_lock: Mutex::new(()),
            read_only,
        }
    }

    /// Read-only copy of the current contents.
    pub fn read_only_snapshot(&self) -> Self {
        Self {
            snapshot: ArcSwap::new(self.snapshot.load_full()),
            write_lock: Mutex::new(()),
            read_only: true,
        }
    }

    /// Mutable copy of the current contents.
    pub fn to_mutable(&self) -> Self {
        Self {
            snapshot: ArcSwap::new(self.snapshot.load_full()),
            write_lock: Mutex::new(()),
            read_only: false,
        }
    }

    /// Whether mutation calls are ignored.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, code: impl AsRef<str>) -> bool {
        self.snapshot
            .load()
            .codes
            .contains_key(&normalize(code.as_ref()))
    }

    /// Whether any member is `ancestor` itself or a descendant of it.
    pub fn contains_descendant_of(&self, ancestor: impl AsRef<str>) -> bool {
        let ancestor = ancestor.as_ref();
        self.contains(ancestor)
            || self
                .snapshot
                .load()
                .codes
                .keys()
                .any(|code| is_descendant(code, ancestor))
    }

    /// Succeeds iff `code` is a member; otherwise denies with the default message.
    pub fn check(
        &self,
        code: &str,
        reason: Option<&dyn ReasonProvider>,
    ) -> Result<(), AccessDenied> {
        self.check_localized(code, reason, None)
    }

    /// Like [`check`](Self::check), asking the provider for a message in `culture`.
    pub fn check_localized(
        &self,
        code: &str,
        reason: Option<&dyn ReasonProvider>,
        culture: Option<&str>,
    ) -> Result<(), AccessDenied> {
        if self.contains(code) {
            return Ok(());
        }
        let message = reason
            .and_then(|provider| provider.denial_reason(code, culture))
            .unwrap_or_else(|| default_denial_message(code, code));
        Err(AccessDenied::new(code, message))
    }

    /// Add one code.
    pub fn add(&self, code: impl Into<PermissionCode>) {
        self.add_range(std::iter::once(code));
    }

    /// Add every code in `codes`.
    pub fn add_range<I, C>(&self, codes: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        if self.read_only {
            return;
        }
        self.mutate(|map| {
            for code in codes {
                let code = code.into();
                map.entry(code.normalized()).or_insert(code);
            }
        });
    }

    /// Remove one code.
    pub fn remove(&self, code: impl AsRef<str>) {
        self.remove_range(std::iter::once(code));
    }

    /// Remove every code in `codes`.
    pub fn remove_range<I, C>(&self, codes: I)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        if self.read_only {
            return;
        }
        self.mutate(|map| {
            for code in codes {
                map.remove(&normalize(code.as_ref()));
            }
        });
    }

    /// Remove everything.
    pub fn clear(&self) {
        if self.read_only {
            return;
        }
        self.mutate(BTreeMap::clear);
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, PermissionCode>)) {
        let _guard = self.write_lock.lock();
        let mut codes = self.snapshot.load().codes.clone();
        apply(&mut codes);
        self.snapshot.store(Arc::new(Snapshot::new(codes)));
    }

    /// Canonical thumbprint of the current contents.
    pub fn thumbprint(&self) -> Thumbprint {
        self.snapshot.load().thumbprint
    }

    /// Members in canonical (normalized, sorted) order, as first supplied.
    pub fn codes(&self) -> Vec<PermissionCode> {
        self.snapshot.load().codes.values().cloned().collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.snapshot.load().codes.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn collect<I, C>(codes: I) -> BTreeMap<String, PermissionCode>
where
    I: IntoIterator<Item = C>,
    C: Into<PermissionCode>,
{
    let mut map = BTreeMap::new();
    for code in codes {
        let code = code.into();
        map.entry(code.normalized()).or_insert(code);
    }
    map
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PermissionSet {
    fn clone(&self) -> Self {
        Self {
            snapshot: ArcSwap::new(self.snapshot.load_full()),
            write_lock: Mutex::new(()),
            read_only: self.read_only,
        }
    }
}

impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.thumbprint() == other.thumbprint()
    }
}

impl Eq for PermissionSet {}

impl Hash for PermissionSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.thumbprint().hash(state);
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("PermissionSet")
            .field("codes", &snapshot.codes.keys().collect::<Vec<_>>())
            .field("thumbprint", &snapshot.thumbprint)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl<C: Into<PermissionCode>> FromIterator<C> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self::from_codes(iter)
    }
}
