//! Configuration for the federated OAuth2 strategy.

use authgate_access::GroupAllowList;
use serde::{Deserialize, Serialize};

/// Configuration for the federated identity provider.
///
/// Loaded once per process from the environment. Every field defaults to
/// empty so an unconfigured deployment still loads; the strategy is only
/// enforced when [`is_enabled`](Self::is_enabled) holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FederatedConfig {
    /// The provider tenant (directory) ID.
    #[serde(default)]
    tenant_id: String,
    /// The OAuth2 client ID registered with the provider.
    #[serde(default)]
    client_id: String,
    /// The OAuth2 client secret.
    #[serde(default)]
    client_secret: String,
    /// The redirect URI the provider sends the callback to.
    #[serde(default)]
    redirect_uri: String,
    /// Comma-separated provider group IDs allowed access.
    /// Empty means no restriction.
    #[serde(default)]
    allowed_groups: String,
    /// Base URL of the provider's authorization service. Override for
    /// sovereign-cloud deployments or tests.
    #[serde(default = "default_authority_base")]
    authority_base: String,
    /// Base URL of the provider's profile/group API. Override for
    /// sovereign-cloud deployments or tests.
    #[serde(default = "default_graph_base")]
    graph_base: String,
}

fn default_authority_base() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_base() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

impl FederatedConfig {
    /// Creates a configuration with the standard provider endpoints.
    #[must_use]
    pub fn new(
        tenant_id: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            redirect_uri,
            allowed_groups: String::new(),
            authority_base: default_authority_base(),
            graph_base: default_graph_base(),
        }
    }

    /// True when the minimum required fields are present. A selected-but-
    /// unconfigured provider fails open: its `require_auth` is a no-op,
    /// flagged as a high-severity warning at startup.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Returns the tenant ID.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Parses the allowed-group list.
    #[must_use]
    pub fn allow_list(&self) -> GroupAllowList {
        GroupAllowList::from_csv(&self.allowed_groups)
    }

    /// The provider's authorization endpoint for this tenant.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_base, self.tenant_id
        )
    }

    /// The provider's token endpoint for this tenant.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_base, self.tenant_id)
    }

    /// The profile endpoint.
    #[must_use]
    pub fn profile_url(&self) -> String {
        format!("{}/me", self.graph_base)
    }

    /// The group-membership endpoint.
    #[must_use]
    pub fn groups_url(&self) -> String {
        format!("{}/me/memberOf", self.graph_base)
    }

    /// Overrides the allowed-group list. Primarily for tests.
    #[must_use]
    pub fn with_allowed_groups(mut self, allowed_groups: String) -> Self {
        self.allowed_groups = allowed_groups;
        self
    }

    /// Overrides the provider endpoints. Primarily for tests.
    #[must_use]
    pub fn with_endpoints(mut self, authority_base: String, graph_base: String) -> Self {
        self.authority_base = authority_base;
        self.graph_base = graph_base;
        self
    }
}
