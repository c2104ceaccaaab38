//! Keystone configuration
//!
//! Loaded in three layers: defaults, then an optional TOML file, then
//! `KEYSTONE_*` environment variables (e.g. `KEYSTONE_SESSION_TTL_MINUTES`).
//!
//! ```toml
//! [session]
//! ttl_minutes = 20
//! traffic_flush_minutes = 5
//! expiration_warning_minutes = 2
//!
//! [authorization]
//! unbound_policy = "allow"
//! ```

use crate::{KeystoneError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "KEYSTONE_";

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    /// Session lifetime and traffic accounting
    pub session: SessionConfig,
    /// Ambient access checking
    pub authorization: AuthorizationConfig,
}

/// Session lifetime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minutes added to `LastAccessedTime` on create and every refresh.
    pub ttl_minutes: u32,
    /// Traffic flush interval. `0` disables traffic accounting entirely.
    pub traffic_flush_minutes: u32,
    /// Window before expiry in which a session should be warned.
    pub expiration_warning_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 20,
            traffic_flush_minutes: 0,
            expiration_warning_minutes: 2,
        }
    }
}

impl SessionConfig {
    /// Session time-to-live.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.ttl_minutes))
    }

    /// Expiration warning window.
    pub fn expiration_warning_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.expiration_warning_minutes))
    }
}

impl ConfigValidation for SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.ttl_minutes == 0 {
            return Err(KeystoneError::invalid("session.ttl_minutes must be positive"));
        }
        if self.expiration_warning_minutes >= self.ttl_minutes {
            return Err(KeystoneError::invalid(format!(
                "session.expiration_warning_minutes ({}) must be below session.ttl_minutes ({})",
                self.expiration_warning_minutes, self.ttl_minutes
            )));
        }
        Ok(())
    }
}

/// What an access check does when no ambient context is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnboundPolicy {
    /// Absence of context passes the check.
    #[default]
    Allow,
    /// Absence of context is treated as not logged on; internal callers
    /// must enter an explicit system scope.
    Deny,
}

impl std::str::FromStr for UnboundPolicy {
    type Err = KeystoneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(KeystoneError::invalid(format!(
                "unknown unbound policy '{other}', expected 'allow' or 'deny'"
            ))),
        }
    }
}

/// Ambient access check settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Decision when neither a session scope nor a client snapshot is active.
    pub unbound_policy: UnboundPolicy,
}

impl KeystoneConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeystoneError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `KEYSTONE_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `KEYSTONE_*` overrides from an explicit variable list.
    ///
    /// Unknown keys under the prefix are ignored.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match key {
                "SESSION_TTL_MINUTES" => self.session.ttl_minutes = parse_minutes(key, value)?,
                "SESSION_TRAFFIC_FLUSH_MINUTES" => {
                    self.session.traffic_flush_minutes = parse_minutes(key, value)?;
                }
                "SESSION_EXPIRATION_WARNING_MINUTES" => {
                    self.session.expiration_warning_minutes = parse_minutes(key, value)?;
                }
                "AUTHORIZATION_UNBOUND_POLICY" => {
                    self.authorization.unbound_policy = value.parse()?;
                }
                _ => tracing::trace!(key, "ignoring unknown keystone environment variable"),
            }
        }
        self.validate()
    }
}

impl ConfigValidation for KeystoneConfig {
    fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}

fn parse_minutes(key: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|e| {
        KeystoneError::config(format!("{ENV_PREFIX}{key}: expected minutes, got '{value}' ({e})"))
    })
}
