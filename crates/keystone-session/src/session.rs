//! Session entity.
//!
//! A [`Session`] is the server-side record of one login: identity fields fixed
//! at construction plus activity, traffic and subscription state that changes
//! while the session lives. Sessions are shared as `Arc<Session>`; every
//! mutable part sits behind its own lock so concurrent requests on one
//! session never serialize on the whole record.
//!
//! ## Lock Usage
//!
//! `parking_lot` locks only, held for field updates and never across calls
//! into the auth module.

use crate::auth_module::AuthModule;
use crate::data_bag::DataBag;
use crate::id::{SessionId, SessionIdGenerator};
use crate::record::{SessionRecord, TrafficReport};
use chrono::{DateTime, Duration, Utc};
use keystone_authorization::PermissionSet;
use keystone_core::{
    ClientAddressResolver, Clock, KeystoneError, Result, SessionConfig, SystemClock,
    UnknownClientAddress,
};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

static EMPTY: Lazy<Arc<Session>> = Lazy::new(|| Arc::new(Session::empty_sentinel()));

/// Collaborators a session needs to stamp times, resolve addresses and
/// mirror itself.
#[derive(Clone)]
pub struct SessionServices {
    auth_module: Option<Arc<dyn AuthModule>>,
    clock: Arc<dyn Clock>,
    client_address: Arc<dyn ClientAddressResolver>,
    ids: Arc<SessionIdGenerator>,
    config: SessionConfig,
}

impl SessionServices {
    /// System clock, unknown client address, global id generator, no auth module.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            auth_module: None,
            clock: Arc::new(SystemClock),
            client_address: Arc::new(UnknownClientAddress),
            ids: SessionIdGenerator::global(),
            config,
        }
    }

    /// Attach the auth module.
    pub fn with_auth_module(mut self, auth_module: Arc<dyn AuthModule>) -> Self {
        self.auth_module = Some(auth_module);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the client address resolver.
    pub fn with_client_address(mut self, resolver: Arc<dyn ClientAddressResolver>) -> Self {
        self.client_address = resolver;
        self
    }

    /// Replace the id generator.
    pub fn with_id_generator(mut self, ids: Arc<SessionIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Attached auth module.
    pub fn auth_module(&self) -> Option<&Arc<dyn AuthModule>> {
        self.auth_module.as_ref()
    }

    /// Current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionServices")
            .field("auth_module", &self.auth_module.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Login request handed to [`Session::create`].
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Account id
    pub user_id: i32,
    /// Login name
    pub login: String,
    /// Creation address; resolved from the current request when `None`
    pub created_ip: Option<String>,
    /// Permissions granted at login; snapshotted read-only
    pub permissions: PermissionSet,
    /// Culture name, e.g. `en-US`
    pub culture: String,
    /// Organization group
    pub org_group_id: Option<i32>,
    /// Product the session is opened for
    pub product_name: String,
    /// Traffic flush interval override; the configured value when `None`
    pub traffic_flush_minutes: Option<u32>,
}

impl NewSession {
    /// Request with defaults for everything but the login.
    pub fn new(user_id: i32, login: impl Into<String>) -> Self {
        Self {
            user_id,
            login: login.into(),
            created_ip: None,
            permissions: PermissionSet::new(),
            culture: String::new(),
            org_group_id: None,
            product_name: String::new(),
            traffic_flush_minutes: None,
        }
    }

    /// Set the granted permissions.
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set the creation address explicitly.
    pub fn with_created_ip(mut self, ip: impl Into<String>) -> Self {
        self.created_ip = Some(ip.into());
        self
    }

    /// Set the culture.
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    /// Set the organization group.
    pub fn with_org_group(mut self, org_group_id: i32) -> Self {
        self.org_group_id = Some(org_group_id);
        self
    }

    /// Set the product name.
    pub fn with_product(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self
    }

    /// Override the traffic flush interval.
    pub fn with_traffic_flush_minutes(mut self, minutes: u32) -> Self {
        self.traffic_flush_minutes = Some(minutes);
        self
    }
}

#[derive(Debug, Clone)]
struct Activity {
    last_accessed_time: DateTime<Utc>,
    last_accessed_ip: String,
    expiration_time: DateTime<Utc>,
    expiration_warning_sent: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Traffic {
    incoming: u64,
    outgoing: u64,
    last_flush: DateTime<Utc>,
}

/// One authenticated actor.
pub struct Session {
    id: SessionId,
    user_id: i32,
    login: String,
    created_time: DateTime<Utc>,
    created_ip: String,
    permissions: PermissionSet,
    culture: String,
    org_group_id: Option<i32>,
    product_name: String,
    traffic_flush_minutes: u32,
    services: Option<SessionServices>,
    activity: RwLock<Activity>,
    traffic: Mutex<Traffic>,
    message_types: RwLock<BTreeSet<String>>,
    data: DataBag,
}

impl Session {
    /// Create a session for an approved login with a freshly minted id.
    ///
    /// The auth module may veto first; no id is consumed in that case. The
    /// session is not stored or persisted here; that happens when it is added
    /// to a [`crate::SessionStore`].
    pub fn create(request: NewSession, services: &SessionServices) -> Result<Arc<Session>> {
        if let Some(auth_module) = &services.auth_module {
            auth_module.approve_session(&request).map_err(|e| {
                debug!(login = %request.login, error = %e, "Auth module vetoed session");
                if matches!(e, KeystoneError::Vetoed { .. }) {
                    e
                } else {
                    KeystoneError::vetoed(e.to_string())
                }
            })?;
        }

        let id = services.ids.next_id();
        let session = Self::build(id, request, services);
        debug!(
            session_id = %session.id,
            login = %session.login,
            created_ip = %session.created_ip,
            "Session created"
        );
        Ok(Arc::new(session))
    }

    /// Rebuild a session from its persisted shape, keeping its id.
    pub fn restore(record: SessionRecord, services: &SessionServices) -> Result<Arc<Session>> {
        if record.session_id.is_empty() {
            return Err(KeystoneError::invalid(
                "session id 0 is reserved for the Empty session",
            ));
        }
        let request = NewSession {
            user_id: record.user_id,
            login: record.login,
            created_ip: Some(record.created_ip),
            permissions: PermissionSet::from_codes(record.permissions),
            culture: record.culture,
            org_group_id: record.org_group_id,
            product_name: record.product_name,
            traffic_flush_minutes: None,
        };
        let session = Self::build(record.session_id, request, services);
        session
            .message_types
            .write()
            .extend(record.message_types);
        Ok(Arc::new(session))
    }

    fn build(id: SessionId, request: NewSession, services: &SessionServices) -> Self {
        let now = services.now();
        let created_ip = request
            .created_ip
            .unwrap_or_else(|| services.client_address.client_address());
        let traffic_flush_minutes = request
            .traffic_flush_minutes
            .unwrap_or(services.config.traffic_flush_minutes);

        Self {
            id,
            user_id: request.user_id,
            login: request.login,
            created_time: now,
            created_ip: created_ip.clone(),
            permissions: request.permissions.read_only_snapshot(),
            culture: request.culture,
            org_group_id: request.org_group_id,
            product_name: request.product_name,
            traffic_flush_minutes,
            services: Some(services.clone()),
            activity: RwLock::new(Activity {
                last_accessed_time: now,
                last_accessed_ip: created_ip,
                expiration_time: now + services.config.ttl(),
                expiration_warning_sent: None,
            }),
            traffic: Mutex::new(Traffic {
                incoming: 0,
                outgoing: 0,
                last_flush: now,
            }),
            message_types: RwLock::new(BTreeSet::new()),
            data: DataBag::new(),
        }
    }

    fn empty_sentinel() -> Self {
        Self {
            id: SessionId::EMPTY,
            user_id: 0,
            login: String::new(),
            created_time: DateTime::<Utc>::MIN_UTC,
            created_ip: String::new(),
            permissions: PermissionSet::read_only(Vec::<String>::new()),
            culture: String::new(),
            org_group_id: None,
            product_name: String::new(),
            traffic_flush_minutes: 0,
            services: None,
            activity: RwLock::new(Activity {
                last_accessed_time: DateTime::<Utc>::MIN_UTC,
                last_accessed_ip: String::new(),
                expiration_time: DateTime::<Utc>::MAX_UTC,
                expiration_warning_sent: None,
            }),
            traffic: Mutex::new(Traffic {
                incoming: 0,
                outgoing: 0,
                last_flush: DateTime::<Utc>::MIN_UTC,
            }),
            message_types: RwLock::new(BTreeSet::new()),
            data: DataBag::detached(),
        }
    }

    /// The "no session" sentinel: id 0, no auth module, never expires.
    pub fn empty() -> Arc<Session> {
        Arc::clone(&EMPTY)
    }

    /// Whether this is the Empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Account id.
    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    /// Login name.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Creation time (UTC).
    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    /// Creation address.
    pub fn created_ip(&self) -> &str {
        &self.created_ip
    }

    /// Read-only permission snapshot taken at login.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Culture name.
    pub fn culture(&self) -> &str {
        &self.culture
    }

    /// Culture, or `None` when unset.
    pub fn culture_opt(&self) -> Option<&str> {
        (!self.culture.is_empty()).then_some(self.culture.as_str())
    }

    /// Organization group.
    pub fn org_group_id(&self) -> Option<i32> {
        self.org_group_id
    }

    /// Product name.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Traffic flush interval in minutes; `0` means traffic is not tracked.
    pub fn traffic_flush_minutes(&self) -> u32 {
        self.traffic_flush_minutes
    }

    /// Time of the last refresh.
    pub fn last_accessed_time(&self) -> DateTime<Utc> {
        self.activity.read().last_accessed_time
    }

    /// Address seen on the last refresh.
    pub fn last_accessed_ip(&self) -> String {
        self.activity.read().last_accessed_ip.clone()
    }

    /// `last_accessed_time + TTL`.
    pub fn expiration_time(&self) -> DateTime<Utc> {
        self.activity.read().expiration_time
    }

    /// When the last expiration warning was sent.
    pub fn expiration_warning_sent(&self) -> Option<DateTime<Utc>> {
        self.activity.read().expiration_warning_sent
    }

    /// Per-owner keyed state. The Empty sentinel's bag ignores writes.
    pub fn data(&self) -> &DataBag {
        &self.data
    }

    /// Mark the session as used now. Must run on every authenticated call.
    pub fn refresh(&self) {
        let Some(services) = &self.services else {
            return;
        };
        let now = services.now();
        let ip = services.client_address.client_address();
        let mut activity = self.activity.write();
        activity.last_accessed_time = activity.last_accessed_time.max(now);
        activity.last_accessed_ip = ip;
        activity.expiration_time = activity.last_accessed_time + services.config.ttl();
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_time()
    }

    /// Whether the session is inside the warning window and has not been
    /// warned since it was last refreshed.
    pub fn needs_expiration_warning(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let activity = self.activity.read();
        if now > activity.expiration_time || now < activity.expiration_time - window {
            return false;
        }
        match activity.expiration_warning_sent {
            Some(sent) => sent < activity.last_accessed_time,
            None => true,
        }
    }

    /// Record that the expiration warning went out at `at`.
    pub fn mark_expiration_warning_sent(&self, at: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        self.activity.write().expiration_warning_sent = Some(at);
    }

    /// Accumulate traffic counters and flush them when due.
    ///
    /// Passing `None` for both counters forces a flush. Flushes also happen
    /// once the flush interval has elapsed. With a zero interval this does
    /// nothing at all.
    pub fn update_traffic(&self, incoming: Option<u64>, outgoing: Option<u64>) {
        if self.traffic_flush_minutes == 0 {
            return;
        }
        let Some(services) = &self.services else {
            return;
        };
        let interval = Duration::minutes(i64::from(self.traffic_flush_minutes));
        let explicit = incoming.is_none() && outgoing.is_none();
        let now = services.now();

        let report = {
            let mut traffic = self.traffic.lock();
            traffic.incoming = traffic.incoming.saturating_add(incoming.unwrap_or(0));
            traffic.outgoing = traffic.outgoing.saturating_add(outgoing.unwrap_or(0));
            if !explicit && now <= traffic.last_flush + interval {
                return;
            }
            let report = TrafficReport {
                session_id: self.id,
                login: self.login.clone(),
                incoming: traffic.incoming,
                outgoing: traffic.outgoing,
                flushed_at: now,
            };
            traffic.incoming = 0;
            traffic.outgoing = 0;
            traffic.last_flush = now;
            report
        };

        if let Some(auth_module) = &services.auth_module {
            if let Err(e) = auth_module.flush_traffic(&report) {
                warn!(
                    session_id = %self.id,
                    incoming = report.incoming,
                    outgoing = report.outgoing,
                    error = %e,
                    "Traffic flush failed"
                );
            }
        }
    }

    /// Traffic accumulated since the last flush, `(incoming, outgoing)`.
    pub fn pending_traffic(&self) -> (u64, u64) {
        let traffic = self.traffic.lock();
        (traffic.incoming, traffic.outgoing)
    }

    /// Subscribe to message types. Duplicates are ignored; the merged set is
    /// forwarded to the auth module. A no-op on the Empty sentinel.
    pub fn add_message_types<I, S>(&self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.is_empty() {
            return;
        }
        let merged: Vec<String> = {
            let mut subscribed = self.message_types.write();
            subscribed.extend(types.into_iter().map(Into::into));
            subscribed.iter().cloned().collect()
        };

        let Some(auth_module) = self.auth_module() else {
            return;
        };
        if let Err(e) = auth_module.persist_message_types(self.id, &merged) {
            warn!(session_id = %self.id, error = %e, "Persisting message types failed");
        }
    }

    /// Subscribed message types, sorted.
    pub fn message_types(&self) -> Vec<String> {
        self.message_types.read().iter().cloned().collect()
    }

    /// Whether the session subscribes to `message_type`.
    pub fn is_subscribed(&self, message_type: &str) -> bool {
        self.message_types.read().contains(message_type)
    }

    /// Persisted shape of this session.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.id,
            user_id: self.user_id,
            login: self.login.clone(),
            created_ip: self.created_ip.clone(),
            org_group_id: self.org_group_id,
            permissions: self
                .permissions
                .codes()
                .into_iter()
                .map(String::from)
                .collect(),
            culture: self.culture.clone(),
            message_types: self.message_types(),
            product_name: self.product_name.clone(),
        }
    }

    /// Auth module backing this session; `None` for the Empty session.
    pub fn auth_module(&self) -> Option<&Arc<dyn AuthModule>> {
        self.services.as_ref().and_then(|s| s.auth_module.as_ref())
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("created_ip", &self.created_ip)
            .field("expiration_time", &self.expiration_time())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<no session>")
        } else {
            write!(f, "{}#{}", self.login, self.id)
        }
    }
}
