//! Error types for the federated strategy.
//!
//! Provider faults are caught at the client boundary and converted to these
//! typed errors; none propagate as unhandled faults. The user-facing text
//! comes from [`FederatedError::client_message`] — internal detail is logged,
//! never surfaced to the client verbatim.

use std::fmt;

/// Errors from the federated OAuth2 flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederatedError {
    /// Provider endpoints could not be constructed from the configuration.
    Configuration(String),
    /// The callback request is missing `code` or `state`.
    InvalidCallback,
    /// The callback `state` did not match the session's pending nonce.
    CsrfMismatch,
    /// The code-for-token exchange failed or returned no access token.
    TokenExchangeFailed(String),
    /// The profile endpoint returned a non-success response.
    ProfileFetchFailed(String),
    /// The group-membership endpoint returned a non-success response.
    GroupFetchFailed(String),
    /// The user is authenticated but not in any allowed group.
    AccessDenied,
}

impl FederatedError {
    /// Client-safe message for this error. Provider responses and internal
    /// detail never reach the browser verbatim.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Authentication is misconfigured",
            Self::InvalidCallback => "Invalid callback parameters",
            Self::CsrfMismatch => "Invalid state parameter",
            Self::TokenExchangeFailed(_) => "Failed to obtain an access token",
            Self::ProfileFetchFailed(_) | Self::GroupFetchFailed(_) => {
                "Failed to retrieve user information"
            }
            Self::AccessDenied => "Access denied: user is not in an allowed group",
        }
    }
}

impl fmt::Display for FederatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "federated configuration error: {msg}"),
            Self::InvalidCallback => write!(f, "callback missing code or state"),
            Self::CsrfMismatch => write!(f, "callback state does not match pending nonce"),
            Self::TokenExchangeFailed(msg) => write!(f, "token exchange failed: {msg}"),
            Self::ProfileFetchFailed(msg) => write!(f, "profile fetch failed: {msg}"),
            Self::GroupFetchFailed(msg) => write!(f, "group fetch failed: {msg}"),
            Self::AccessDenied => write!(f, "user is not in an allowed group"),
        }
    }
}

impl std::error::Error for FederatedError {}
