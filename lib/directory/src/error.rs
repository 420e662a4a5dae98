//! Error types for the directory strategy.
//!
//! The user-facing text comes from [`DirectoryError::client_message`].
//! Whether a login failed because the account does not exist, matched more
//! than one entry, or carried a wrong password is indistinguishable to the
//! client; the distinction only reaches the logs.

use std::fmt;

/// Errors from the directory-bind flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No configured host accepted a connection.
    ConnectFailed(String),
    /// The service account (or anonymous) lookup bind was rejected.
    ServiceBindFailed(String),
    /// The user search failed at the protocol level.
    SearchFailed(String),
    /// The search matched no entry.
    NotFound,
    /// The search matched more than one entry.
    AmbiguousMatch,
    /// Username or password was empty.
    MissingCredentials,
    /// The credential bind as the user was rejected.
    InvalidCredentials,
    /// The user authenticated but is not in any allowed group.
    AccessDenied,
}

impl DirectoryError {
    /// Client-safe message for this error.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::ConnectFailed(_) | Self::ServiceBindFailed(_) => {
                "Directory service is unavailable"
            }
            Self::SearchFailed(_) => "Directory lookup failed",
            // Account-enumeration guard: absent, ambiguous, and wrong-password
            // logins all read the same to the client.
            Self::NotFound | Self::AmbiguousMatch | Self::InvalidCredentials => {
                "Invalid username or password"
            }
            Self::MissingCredentials => "Username and password are required",
            Self::AccessDenied => "Access denied: user is not in an allowed group",
        }
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(msg) => write!(f, "directory connect failed: {msg}"),
            Self::ServiceBindFailed(msg) => write!(f, "service bind failed: {msg}"),
            Self::SearchFailed(msg) => write!(f, "user search failed: {msg}"),
            Self::NotFound => write!(f, "user search matched no entry"),
            Self::AmbiguousMatch => write!(f, "user search matched more than one entry"),
            Self::MissingCredentials => write!(f, "username or password was empty"),
            Self::InvalidCredentials => write!(f, "credential bind rejected"),
            Self::AccessDenied => write!(f, "user is not in an allowed group"),
        }
    }
}

impl std::error::Error for DirectoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_are_indistinguishable_to_the_client() {
        let not_found = DirectoryError::NotFound.client_message();
        let ambiguous = DirectoryError::AmbiguousMatch.client_message();
        let bad_password = DirectoryError::InvalidCredentials.client_message();
        assert_eq!(not_found, bad_password);
        assert_eq!(ambiguous, bad_password);
    }

    #[test]
    fn client_messages_do_not_leak_detail() {
        let err = DirectoryError::ConnectFailed("dc1.internal.example refused".to_string());
        assert!(!err.client_message().contains("dc1.internal.example"));
        assert!(err.to_string().contains("dc1.internal.example"));
    }
}
