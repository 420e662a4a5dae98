//! Session state for authenticated users.
//!
//! The session is keyed by an opaque identifier held in a client-side cookie
//! and owned exclusively by the [`SessionStore`]. It is created on first
//! request, populated on successful authentication, and cleared on logout.
//! Exactly one strategy's shape is populated at any time; switching the
//! configured method implicitly invalidates prior sessions because the
//! reader looks at the other shape.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authgate_core::AuthUser;

/// Unique identifier for a session, carried in the session cookie.
///
/// Session IDs are opaque strings generated by [`generate_session_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generates a unique session ID using ULID.
#[must_use]
pub fn generate_session_id() -> SessionId {
    SessionId::new(ulid::Ulid::new().to_string())
}

/// Identity established by the federated strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    /// The provider's object ID for the user.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Primary email address, empty when the provider supplied none.
    pub email: String,
    /// User principal name (login identifier at the provider).
    pub user_principal_name: String,
}

impl From<&FederatedIdentity> for AuthUser {
    fn from(identity: &FederatedIdentity) -> Self {
        AuthUser::new(
            identity.display_name.clone(),
            identity.email.clone(),
            identity.user_principal_name.clone(),
        )
    }
}

/// Identity established by the directory strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryIdentity {
    /// Full distinguished name of the user entry.
    pub distinguished_name: String,
    /// Account name (sAMAccountName).
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Email address, empty when the directory holds none.
    pub email: String,
    /// User principal name, empty when the directory holds none.
    pub user_principal_name: String,
}

impl From<&DirectoryIdentity> for AuthUser {
    fn from(identity: &DirectoryIdentity) -> Self {
        AuthUser::new(
            identity.display_name.clone(),
            identity.email.clone(),
            identity.username.clone(),
        )
    }
}

/// Session state written by the federated strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedSession {
    /// The authenticated identity.
    pub identity: FederatedIdentity,
    /// The raw access token from the provider.
    pub access_token: String,
    /// Absolute expiry of the access token. Past this instant the user is
    /// sent through a full re-authentication round trip; there is no silent
    /// refresh flow.
    pub token_expires_at: DateTime<Utc>,
}

impl FederatedSession {
    /// Returns true once the access token's absolute expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at < now
    }
}

/// Session state written by the directory strategy.
///
/// Directory sessions use a flat inactivity timeout from the login instant
/// rather than token renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySession {
    /// The authenticated identity.
    pub identity: DirectoryIdentity,
    /// Set on successful credential bind.
    pub authenticated: bool,
    /// When the user logged in.
    pub login_at: DateTime<Utc>,
}

impl DirectorySession {
    /// Returns true once strictly more than `timeout_seconds` have elapsed
    /// since login. A session exactly at the boundary is still valid.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, timeout_seconds: u64) -> bool {
        (now - self.login_at).num_seconds() > timeout_seconds as i64
    }
}

/// All per-session state owned by the gateway.
///
/// `federated` and `directory` are mutually exclusive within one session
/// lifetime; the strategies only ever write their own shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Pending CSRF nonce during the federated redirect round trip.
    /// Single-use: consumed on callback whether or not it matched.
    pub oauth_state: Option<String>,
    /// Federated session state, when that strategy is active.
    pub federated: Option<FederatedSession>,
    /// Directory session state, when that strategy is active.
    pub directory: Option<DirectorySession>,
}

/// The key-value session seam between the gateway and its storage.
///
/// Implementations must survive across requests within the session lifetime
/// and clear atomically per logout. Mutation happens only from the request
/// currently processing that session; different sessions never contend.
pub trait SessionStore: Send + Sync {
    /// Loads the session state, if any exists for this ID.
    fn load(&self, id: &SessionId) -> Option<SessionData>;

    /// Replaces the session state for this ID.
    fn save(&self, id: &SessionId, data: SessionData);

    /// Removes all state for this ID. Clearing an absent session is a no-op.
    fn clear(&self, id: &SessionId);
}

/// Process-local session store backing the gateway.
///
/// Sessions do not survive a process restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionData>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Option<SessionData> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .get(id)
            .cloned()
    }

    fn save(&self, id: &SessionId, data: SessionData) {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .insert(id.clone(), data);
    }

    fn clear(&self, id: &SessionId) {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .remove(id);
    }
}
