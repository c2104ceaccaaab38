//! Persisted shape of a session.

use crate::id::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the auth module stores for a session. Format-agnostic; the field
/// names below are the logical column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session id
    #[serde(rename = "SessionId")]
    pub session_id: SessionId,
    /// Account id
    #[serde(rename = "UserId")]
    pub user_id: i32,
    /// Login name
    #[serde(rename = "Login")]
    pub login: String,
    /// Address the session was created from
    #[serde(rename = "CreatedIP")]
    pub created_ip: String,
    /// Organization group, if any
    #[serde(rename = "OrgGroupId")]
    pub org_group_id: Option<i32>,
    /// Permission codes granted at login
    #[serde(rename = "Permissions")]
    pub permissions: Vec<String>,
    /// Culture name, e.g. `en-US`
    #[serde(rename = "Culture")]
    pub culture: String,
    /// Subscribed message types
    #[serde(rename = "MessageTypes")]
    pub message_types: Vec<String>,
    /// Product the session was opened for
    #[serde(rename = "ProductName", default)]
    pub product_name: String,
}

/// Traffic accumulated since the previous flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficReport {
    /// Session the traffic belongs to
    pub session_id: SessionId,
    /// Login of the session
    pub login: String,
    /// Bytes received
    pub incoming: u64,
    /// Bytes sent
    pub outgoing: u64,
    /// When the flush happened
    pub flushed_at: DateTime<Utc>,
}
