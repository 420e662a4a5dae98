//! OAuth2 and Graph API client for the federated strategy.

use std::time::Duration;

use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;

use crate::config::FederatedConfig;
use crate::error::FederatedError;
use authgate_access::FederatedIdentity;

/// Scopes requested from the provider: OIDC identity claims plus the
/// resource-read scope for the profile/group API.
const SCOPES: &[&str] = &["openid", "profile", "email", "User.Read"];

/// Token lifetime assumed when the provider omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3600;

/// Upper bound on any single provider HTTP call. A provider that never
/// responds fails the request with a timeout error rather than hanging it.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful code-for-token exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// The opaque access token.
    pub access_token: String,
    /// Declared token lifetime in seconds.
    pub expires_in_seconds: u64,
}

/// Client for the federated identity provider.
#[derive(Debug)]
pub struct FederatedClient {
    config: FederatedConfig,
}

impl FederatedClient {
    /// Creates a client over the given configuration.
    #[must_use]
    pub fn new(config: FederatedConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FederatedConfig {
        &self.config
    }

    /// Builds the provider authorization URL with a fresh CSRF state nonce.
    ///
    /// Returns the URL to redirect the user to and the nonce, which the
    /// caller stores in the session as the pending single-use CSRF token.
    pub fn authorization_url(&self) -> Result<(String, String), FederatedError> {
        let auth_url = AuthUrl::new(self.config.authorize_url())
            .map_err(|e| FederatedError::Configuration(format!("invalid authorize URL: {e}")))?;
        let redirect_url = RedirectUrl::new(self.config.redirect_uri().to_string())
            .map_err(|e| FederatedError::Configuration(format!("invalid redirect URI: {e}")))?;

        let client = BasicClient::new(ClientId::new(self.config.client_id().to_string()))
            .set_auth_uri(auth_url)
            .set_redirect_uri(redirect_url);

        let mut auth_request = client.authorize_url(CsrfToken::new_random);
        for scope in SCOPES {
            auth_request = auth_request.add_scope(Scope::new((*scope).to_string()));
        }
        auth_request = auth_request.add_extra_param("response_mode", "query");

        let (url, csrf_token) = auth_request.url();
        Ok((url.to_string(), csrf_token.secret().clone()))
    }

    /// Exchanges the authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, FederatedError> {
        let token_url = TokenUrl::new(self.config.token_url())
            .map_err(|e| FederatedError::Configuration(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(self.config.redirect_uri().to_string())
            .map_err(|e| FederatedError::Configuration(format!("invalid redirect URI: {e}")))?;

        let client = BasicClient::new(ClientId::new(self.config.client_id().to_string()))
            .set_client_secret(ClientSecret::new(self.config.client_secret().to_string()))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let http_client = self.http_client()?;

        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| FederatedError::TokenExchangeFailed(e.to_string()))?;

        let access_token = token_response.access_token().secret().clone();
        if access_token.is_empty() {
            return Err(FederatedError::TokenExchangeFailed(
                "provider returned an empty access token".to_string(),
            ));
        }

        Ok(TokenGrant {
            access_token,
            expires_in_seconds: token_response
                .expires_in()
                .map_or(DEFAULT_TOKEN_LIFETIME_SECONDS, |d| d.as_secs()),
        })
    }

    /// Retrieves the user profile with the access token.
    pub async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<FederatedIdentity, FederatedError> {
        let response = self
            .http_client()?
            .get(self.config.profile_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FederatedError::ProfileFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FederatedError::ProfileFetchFailed(format!(
                "profile endpoint returned {}",
                response.status()
            )));
        }

        let profile: GraphProfile = response
            .json()
            .await
            .map_err(|e| FederatedError::ProfileFetchFailed(e.to_string()))?;

        Ok(profile.into_identity())
    }

    /// Retrieves the user's group membership IDs, following pagination.
    pub async fn fetch_groups(&self, access_token: &str) -> Result<Vec<String>, FederatedError> {
        let http_client = self.http_client()?;
        let mut groups = Vec::new();
        let mut next_url = Some(self.config.groups_url());

        while let Some(url) = next_url {
            let response = http_client
                .get(&url)
                .bearer_auth(access_token)
                .send()
                .await
                .map_err(|e| FederatedError::GroupFetchFailed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(FederatedError::GroupFetchFailed(format!(
                    "group endpoint returned {}",
                    response.status()
                )));
            }

            let page: GraphGroupPage = response
                .json()
                .await
                .map_err(|e| FederatedError::GroupFetchFailed(e.to_string()))?;

            groups.extend(page.value.into_iter().filter_map(|g| g.id));
            next_url = page.next_link;
        }

        Ok(groups)
    }

    fn http_client(&self) -> Result<reqwest::Client, FederatedError> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FederatedError::Configuration(format!("failed to create HTTP client: {e}")))
    }
}

/// User record returned by the profile endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphProfile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
}

impl GraphProfile {
    fn into_identity(self) -> FederatedIdentity {
        // Prefer the mailbox address, fall back to the principal name.
        let email = self
            .mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_default();
        FederatedIdentity {
            id: self.id.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            email,
            user_principal_name: self.user_principal_name.unwrap_or_default(),
        }
    }
}

/// One page of the group-membership listing.
#[derive(Debug, Deserialize)]
struct GraphGroupPage {
    #[serde(default)]
    value: Vec<GraphGroup>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphGroup {
    id: Option<String>,
}
