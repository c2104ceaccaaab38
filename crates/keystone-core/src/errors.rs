//! Unified error system for Keystone
//!
//! A single error type shared by every Keystone crate. Authorization outcomes are
//! deliberately *not* part of this type: they travel as [`crate::AuthorizationFault`]
//! so the transport layer can map them to protocol faults without inspecting
//! infrastructure failures.

use serde::{Deserialize, Serialize};

/// Unified error type for all Keystone operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum KeystoneError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// A permission kind does not descend from the permission root or is abstract
    #[error("Invalid permission kind: {path}")]
    InvalidPermissionKind {
        /// Fully-qualified path of the offending kind
        path: String,
    },

    /// The auth module refused to let a session be created
    #[error("Session creation vetoed: {message}")]
    Vetoed {
        /// Reason reported by the auth module
        message: String,
    },

    /// The persistence collaborator failed
    #[error("Persistence error: {message}")]
    Persistence {
        /// Error message describing the persistence failure
        message: String,
    },

    /// Configuration file or environment could not be loaded
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl KeystoneError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid permission kind error
    pub fn invalid_permission_kind(path: impl Into<String>) -> Self {
        Self::InvalidPermissionKind { path: path.into() }
    }

    /// Create a creation veto error
    pub fn vetoed(message: impl Into<String>) -> Self {
        Self::Vetoed {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for Keystone operations
pub type Result<T> = std::result::Result<T, KeystoneError>;

impl From<std::io::Error> for KeystoneError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for KeystoneError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}
