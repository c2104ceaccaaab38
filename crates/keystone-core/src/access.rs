//! Authorization outcomes surfaced to the transport boundary.
//!
//! Three conditions are kept apart because the transport maps each to a
//! different protocol-level fault:
//!
//! ```text
//! no session bound            -> AuthorizationFault::NotLoggedOn
//! session lacks a permission  -> AuthorizationFault::AccessDenied(AccessDenied)
//! account / licence exhausted -> AuthorizationFault::LicenseExhausted
//! ```

use serde::{Deserialize, Serialize};

/// The caller is logged on but does not hold a required permission code.
///
/// Carries the failing code and a message already localized to the caller's
/// culture when a reason provider supplied one. Nothing else about the
/// permission set is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct AccessDenied {
    code: String,
    message: String,
}

impl AccessDenied {
    /// Create a denial for `code` with a human-readable message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a denial carrying the default message for `code`.
    pub fn with_default_message(code: impl Into<String>) -> Self {
        let code = code.into();
        let message = default_denial_message(&code, &code);
        Self { code, message }
    }

    /// The permission code that failed the check.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Default denial text used when no reason provider answers.
pub fn default_denial_message(code: &str, display_name: &str) -> String {
    if code == display_name {
        format!("access denied: permission '{code}' is required")
    } else {
        format!("access denied: permission '{display_name}' ({code}) is required")
    }
}

/// Every way an authorization decision can fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuthorizationFault {
    /// No session is bound to the current request.
    #[error("not logged on")]
    NotLoggedOn,

    /// Logged on, but a required permission is missing.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// Logged on, but the account or licence has no remaining capacity.
    #[error("license exhausted: {reason}")]
    LicenseExhausted {
        /// Why the licence check failed
        reason: String,
    },
}

impl AuthorizationFault {
    /// Create a licence exhaustion fault.
    pub fn license_exhausted(reason: impl Into<String>) -> Self {
        Self::LicenseExhausted {
            reason: reason.into(),
        }
    }

    /// Stable identifier the transport layer maps to a protocol fault.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotLoggedOn => "not_logged_on",
            Self::AccessDenied(_) => "access_denied",
            Self::LicenseExhausted { .. } => "license_exhausted",
        }
    }

    /// The denied code, if this is a permission denial.
    pub fn denied_code(&self) -> Option<&str> {
        match self {
            Self::AccessDenied(denied) => Some(denied.code()),
            _ => None,
        }
    }
}
