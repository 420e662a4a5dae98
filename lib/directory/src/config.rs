//! Configuration for the directory-bind strategy.

use authgate_access::GroupAllowList;
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    389
}

fn default_user_filter() -> String {
    "(sAMAccountName={username})".to_string()
}

fn default_group_filter() -> String {
    "(member={dn})".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_session_timeout_seconds() -> u64 {
    28_800
}

/// Configuration for the directory service.
///
/// Loaded once per process from the environment. Every field defaults so an
/// unconfigured deployment still loads; the strategy is only enforced when
/// [`is_enabled`](Self::is_enabled) holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Comma-separated directory hosts, tried in order until one connects.
    #[serde(default)]
    hosts: String,
    /// Directory port, shared by all hosts.
    #[serde(default = "default_port")]
    port: u16,
    /// Connect with implicit TLS (`ldaps://`).
    #[serde(default)]
    use_tls: bool,
    /// Upgrade a plain connection with StartTLS after connecting.
    #[serde(default)]
    start_tls: bool,
    /// Base DN for user searches.
    #[serde(default)]
    base_dn: String,
    /// Service account DN for the lookup bind. Empty means anonymous.
    #[serde(default)]
    bind_dn: String,
    /// Service account password.
    #[serde(default)]
    bind_password: String,
    /// Search filter template; `{username}` is replaced with the escaped
    /// submitted username.
    #[serde(default = "default_user_filter")]
    user_filter: String,
    /// Group search filter template; `{dn}` is replaced with the user's
    /// escaped distinguished name. Group gating reads the user entry's
    /// `memberOf` values, so this only matters for deployments that search
    /// groups by reverse membership.
    #[serde(default = "default_group_filter")]
    group_filter: String,
    /// Comma-separated group names allowed access. Empty means no
    /// restriction. Matching is case-insensitive substring against the
    /// user's `memberOf` values.
    #[serde(default)]
    allowed_groups: String,
    /// Connect timeout per host, in seconds.
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    /// Flat session lifetime from the login instant, in seconds.
    #[serde(default = "default_session_timeout_seconds")]
    session_timeout_seconds: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            hosts: String::new(),
            port: default_port(),
            use_tls: false,
            start_tls: false,
            base_dn: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            user_filter: default_user_filter(),
            group_filter: default_group_filter(),
            allowed_groups: String::new(),
            timeout_seconds: default_timeout_seconds(),
            session_timeout_seconds: default_session_timeout_seconds(),
        }
    }
}

impl DirectoryConfig {
    /// Creates a configuration for the given hosts and search base with all
    /// other fields at their defaults.
    #[must_use]
    pub fn new(hosts: String, base_dn: String) -> Self {
        Self {
            hosts,
            base_dn,
            ..Self::default()
        }
    }

    /// True when the minimum required fields are present. A selected-but-
    /// unconfigured directory fails open: its `require_auth` is a no-op,
    /// flagged as a high-severity warning at startup.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.hosts.trim().is_empty() && !self.base_dn.trim().is_empty()
    }

    /// Connection URLs in failover order, one per configured host.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        self.hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|host| format!("{scheme}://{host}:{}", self.port))
            .collect()
    }

    /// Returns the search base DN.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Returns the service account DN, empty for anonymous lookups.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Returns the service account password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        &self.bind_password
    }

    /// Returns the user search filter template.
    #[must_use]
    pub fn user_filter(&self) -> &str {
        &self.user_filter
    }

    /// Returns the group search filter template.
    #[must_use]
    pub fn group_filter(&self) -> &str {
        &self.group_filter
    }

    /// Whether hosts are dialed with implicit TLS (`ldaps://`).
    #[must_use]
    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Whether to upgrade plain connections with StartTLS.
    #[must_use]
    pub fn start_tls(&self) -> bool {
        self.start_tls
    }

    /// Connect timeout per host.
    #[must_use]
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Flat session lifetime from the login instant.
    #[must_use]
    pub fn session_timeout_seconds(&self) -> u64 {
        self.session_timeout_seconds
    }

    /// Parses the allowed-group list.
    #[must_use]
    pub fn allow_list(&self) -> GroupAllowList {
        GroupAllowList::from_csv(&self.allowed_groups)
    }

    /// Overrides the allowed-group list. Primarily for tests.
    #[must_use]
    pub fn with_allowed_groups(mut self, allowed_groups: String) -> Self {
        self.allowed_groups = allowed_groups;
        self
    }

    /// Overrides the directory port. Primarily for tests.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the connect timeout. Primarily for tests.
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the service account used for the lookup bind. Primarily for
    /// tests.
    #[must_use]
    pub fn with_service_account(mut self, bind_dn: String, bind_password: String) -> Self {
        self.bind_dn = bind_dn;
        self.bind_password = bind_password;
        self
    }
}
