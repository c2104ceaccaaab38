//! Permission codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the kind identities of a compound code.
pub const SEPARATOR: &str = ".";

/// Hierarchical string identity of a permission.
///
/// A code produced from a kind joins the identity of every ancestor, root to
/// leaf, so a subkind's code always has its ancestor's code as a strict
/// prefix. Codes can also be plain strings supplied by the auth module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Wrap a code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-normalized form used for set membership and thumbprints.
    pub fn normalized(&self) -> String {
        normalize(&self.0)
    }

    /// Kind identities, root side first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Code of the direct parent kind, if this code has more than one segment.
    pub fn parent(&self) -> Option<PermissionCode> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| PermissionCode::new(parent))
    }

    /// Every prefix level from the outermost ancestor down to this code.
    pub fn prefixes(&self) -> Vec<PermissionCode> {
        let mut prefixes = Vec::with_capacity(self.depth());
        let mut end = 0;
        for segment in self.segments() {
            end += segment.len();
            prefixes.push(PermissionCode::new(&self.0[..end]));
            end += SEPARATOR.len();
        }
        prefixes
    }

    /// Strict "is-a" test: `ancestor` followed by the separator is a prefix of
    /// this code. Case-insensitive.
    pub fn is_descendant_of(&self, ancestor: &PermissionCode) -> bool {
        is_descendant(self.as_str(), ancestor.as_str())
    }
}

pub(crate) fn normalize(code: &str) -> String {
    code.to_uppercase()
}

pub(crate) fn is_descendant(code: &str, ancestor: &str) -> bool {
    let Some(head) = code.get(..ancestor.len()) else {
        return false;
    };
    !ancestor.is_empty()
        && head.to_uppercase() == ancestor.to_uppercase()
        && code[ancestor.len()..].starts_with(SEPARATOR)
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for PermissionCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PermissionCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}
