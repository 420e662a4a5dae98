//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the gateway,
//! loaded via the `config` crate from environment variables with a `__`
//! separator, so `SESSION__SECURE_COOKIES=false` sets
//! [`SessionConfig::secure_cookies`].
//!
//! The strategy configs are owned by their crates; see
//! [`FederatedConfig`](authgate_federated::FederatedConfig) and
//! [`DirectoryConfig`](authgate_directory::DirectoryConfig).

use serde::Deserialize;

use authgate_federated::FederatedConfig;

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_auth_method() -> String {
    "none".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Socket address the gateway listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Which authentication strategy to run. Accepts the method names and
    /// their synonyms understood by
    /// [`AuthMethod`](authgate_core::AuthMethod).
    #[serde(default = "default_auth_method")]
    pub auth_method: String,

    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Federated strategy configuration.
    #[serde(default)]
    pub federated: FederatedConfig,

    /// Directory strategy configuration.
    #[cfg(feature = "directory")]
    #[serde(default)]
    pub directory: authgate_directory::DirectoryConfig,
}

/// Session-cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP
    /// development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Comma-separated names of additional application cookies cleared on
    /// logout, so stale application state does not outlive the session.
    #[serde(default)]
    pub aux_cookies: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            aux_cookies: String::new(),
        }
    }
}

impl SessionConfig {
    /// The application cookie names cleared on logout.
    #[must_use]
    pub fn aux_cookie_names(&self) -> Vec<String> {
        self.aux_cookies
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
