//! The authentication strategy selector.
//!
//! The deployment picks exactly one strategy via the `AUTH_METHOD`
//! configuration value. The free-form string is resolved into this enum once
//! at startup; an unrecognized value is a fatal configuration error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The authentication strategy selected for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Federated OAuth2 against the Entra ID identity platform.
    Federated,
    /// On-premises directory credential bind (Active Directory over LDAP).
    Directory,
    /// No authentication. Every request passes with the guest identity.
    Disabled,
}

impl AuthMethod {
    /// Human-readable name of the active method, shown by the wrapped
    /// application (e.g. in a footer or account menu).
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Federated => "Azure AD",
            Self::Directory => "Active Directory",
            Self::Disabled => "None (Development)",
        }
    }
}

/// Error returned when the configured method string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAuthMethod(pub String);

impl fmt::Display for UnknownAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid auth method '{}': must be one of \"azure\", \"ldap\", or \"none\"",
            self.0
        )
    }
}

impl std::error::Error for UnknownAuthMethod {}

impl FromStr for AuthMethod {
    type Err = UnknownAuthMethod;

    /// Parses the selector, case-insensitively, accepting the historical
    /// synonym aliases for each strategy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "federated" | "azure" | "entra" => Ok(Self::Federated),
            "directory" | "ldap" | "ad" => Ok(Self::Directory),
            "disabled" | "none" => Ok(Self::Disabled),
            _ => Err(UnknownAuthMethod(s.to_string())),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Federated => "federated",
            Self::Directory => "directory",
            Self::Disabled => "disabled",
        };
        write!(f, "{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_federated_synonyms() {
        for s in ["federated", "azure", "entra", "AZURE", "Entra"] {
            assert_eq!(s.parse::<AuthMethod>(), Ok(AuthMethod::Federated), "{s}");
        }
    }

    #[test]
    fn parses_directory_synonyms() {
        for s in ["directory", "ldap", "ad", "LDAP", "Ad"] {
            assert_eq!(s.parse::<AuthMethod>(), Ok(AuthMethod::Directory), "{s}");
        }
    }

    #[test]
    fn parses_disabled_synonyms() {
        for s in ["disabled", "none", "None", " none "] {
            assert_eq!(s.parse::<AuthMethod>(), Ok(AuthMethod::Disabled), "{s}");
        }
    }

    #[test]
    fn rejects_unknown_method() {
        let err = "kerberos".parse::<AuthMethod>().unwrap_err();
        assert!(err.to_string().contains("kerberos"));
    }

    #[test]
    fn display_names() {
        assert_eq!(AuthMethod::Federated.display_name(), "Azure AD");
        assert_eq!(AuthMethod::Directory.display_name(), "Active Directory");
        assert_eq!(AuthMethod::Disabled.display_name(), "None (Development)");
    }
}
