//! The normalized user record exposed to the wrapped application.

use serde::{Deserialize, Serialize};

/// A normalized view of the authenticated user.
///
/// Every authentication strategy produces this same shape, so the wrapped
/// application never needs to know which strategy established the identity.
/// When authentication is disabled the gateway hands out the fixed
/// [`AuthUser::guest`] record instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Display name ("Jane Doe").
    pub name: String,
    /// Email address, empty string when the provider supplied none.
    pub email: String,
    /// Account name ("jdoe" for directory users, the principal name for
    /// federated users, "guest" when authentication is disabled).
    pub username: String,
}

impl AuthUser {
    /// Creates a normalized user record.
    #[must_use]
    pub fn new(name: String, email: String, username: String) -> Self {
        Self {
            name,
            email,
            username,
        }
    }

    /// The fixed guest identity used when authentication is disabled.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            name: "Guest".to_string(),
            email: String::new(),
            username: "guest".to_string(),
        }
    }
}
