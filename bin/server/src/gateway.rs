//! Strategy selection and the unified current-user view.
//!
//! The gateway owns exactly one strategy for the process lifetime, chosen at
//! startup from `auth_method`. Request handlers talk to the [`Gateway`]
//! rather than to a strategy directly, so the wrapped application sees the
//! same surface whichever method is configured.

use std::fmt;

use chrono::Utc;
use tracing::warn;

use crate::config::ServerConfig;
use authgate_access::{AuthOutcome, LoginSubmission, MemorySessionStore, SessionId, SessionStore};
use authgate_core::{AuthMethod, AuthUser, UnknownAuthMethod};
use authgate_federated::{CallbackQuery, FederatedFlow};

#[cfg(feature = "directory")]
use authgate_directory::DirectoryFlow;

/// Errors raised while constructing the gateway. All are fatal at startup.
#[derive(Debug)]
pub enum GatewayError {
    /// `auth_method` named no known strategy.
    UnknownMethod(UnknownAuthMethod),
    /// The selected strategy is not compiled into this build.
    MissingCapability(&'static str),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod(err) => write!(f, "{err}"),
            Self::MissingCapability(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

#[derive(Debug)]
enum Strategy {
    Federated(FederatedFlow),
    #[cfg(feature = "directory")]
    Directory(DirectoryFlow),
    Disabled,
}

/// The per-process authentication gateway.
#[derive(Debug)]
pub struct Gateway {
    method: AuthMethod,
    strategy: Strategy,
    store: MemorySessionStore,
}

impl Gateway {
    /// Selects and constructs the strategy named by the configuration.
    ///
    /// An unknown method name and a method missing from this build are both
    /// fatal. A known method whose strategy configuration is incomplete is
    /// not: the strategy loads disabled, every request passes through, and a
    /// warning says so.
    pub fn from_config(config: &ServerConfig) -> Result<Self, GatewayError> {
        let method: AuthMethod = config
            .auth_method
            .parse()
            .map_err(GatewayError::UnknownMethod)?;

        let strategy = match method {
            AuthMethod::Federated => {
                let flow = FederatedFlow::new(config.federated.clone());
                if !flow.is_enabled() {
                    warn!(
                        "federated authentication selected but not fully configured; \
                         all requests will pass through unauthenticated"
                    );
                }
                Strategy::Federated(flow)
            }
            #[cfg(feature = "directory")]
            AuthMethod::Directory => {
                let flow = DirectoryFlow::new(config.directory.clone());
                if !flow.is_enabled() {
                    warn!(
                        "directory authentication selected but not fully configured; \
                         all requests will pass through unauthenticated"
                    );
                }
                Strategy::Directory(flow)
            }
            #[cfg(not(feature = "directory"))]
            AuthMethod::Directory => {
                return Err(GatewayError::MissingCapability(
                    "directory authentication selected but this build does not include it",
                ));
            }
            AuthMethod::Disabled => {
                warn!("authentication is disabled; all requests pass through as guest");
                Strategy::Disabled
            }
        };

        Ok(Self {
            method,
            strategy,
            store: MemorySessionStore::new(),
        })
    }

    /// The configured authentication method.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    /// Human-readable name of the configured method.
    #[must_use]
    pub fn method_display_name(&self) -> &'static str {
        self.method.display_name()
    }

    /// Makes the authentication decision for one request.
    ///
    /// `callback` carries federated callback parameters and `submission` a
    /// directory login POST; each strategy only reads its own.
    pub async fn require_auth(
        &self,
        session_id: &SessionId,
        callback: Option<CallbackQuery>,
        submission: Option<LoginSubmission>,
        path: &str,
    ) -> AuthOutcome {
        match &self.strategy {
            Strategy::Federated(flow) => {
                flow.require_auth(&self.store, session_id, callback, path)
                    .await
            }
            #[cfg(feature = "directory")]
            Strategy::Directory(flow) => {
                flow.require_auth(&self.store, session_id, submission, path)
                    .await
            }
            Strategy::Disabled => {
                let _ = (callback, submission);
                AuthOutcome::Continue
            }
        }
    }

    /// The authenticated identity for this session, normalized across
    /// strategies. Disabled authentication reports the guest user.
    #[must_use]
    pub fn current_user(&self, session_id: &SessionId) -> Option<AuthUser> {
        match &self.strategy {
            Strategy::Federated(_) => {
                let data = self.store.load(session_id)?;
                let session = data.federated?;
                if session.is_expired(Utc::now()) {
                    return None;
                }
                Some(AuthUser::from(&session.identity))
            }
            #[cfg(feature = "directory")]
            Strategy::Directory(flow) => {
                let data = self.store.load(session_id)?;
                let session = data.directory?;
                if !session.authenticated
                    || session.is_expired(Utc::now(), flow.session_timeout_seconds())
                {
                    return None;
                }
                Some(AuthUser::from(&session.identity))
            }
            Strategy::Disabled => Some(AuthUser::guest()),
        }
    }

    /// True when this session may reach the wrapped application without a
    /// round trip through the strategy.
    #[must_use]
    pub fn is_authenticated(&self, session_id: &SessionId) -> bool {
        match &self.strategy {
            Strategy::Disabled => true,
            _ => self.current_user(session_id).is_some(),
        }
    }

    /// Discards all server-side state for this session. Idempotent; a no-op
    /// when authentication is disabled.
    pub fn logout(&self, session_id: &SessionId) {
        if matches!(self.strategy, Strategy::Disabled) {
            return;
        }
        self.store.clear(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use authgate_access::{
        DirectorySession, FederatedSession, SessionData, generate_session_id,
    };
    use chrono::Duration;

    fn config_with_method(auth_method: &str) -> ServerConfig {
        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            auth_method: auth_method.to_string(),
            session: SessionConfig::default(),
            federated: authgate_federated::FederatedConfig::default(),
            #[cfg(feature = "directory")]
            directory: authgate_directory::DirectoryConfig::default(),
        }
    }

    #[test]
    fn unknown_method_is_fatal() {
        let err = Gateway::from_config(&config_with_method("kerberos")).expect_err("fatal");
        assert!(matches!(err, GatewayError::UnknownMethod(_)));
    }

    #[test]
    fn method_synonyms_select_the_same_strategy() {
        for name in ["azure", "entra", "AZURE"] {
            let gateway = Gateway::from_config(&config_with_method(name)).expect("gateway");
            assert_eq!(gateway.method(), AuthMethod::Federated);
            assert_eq!(gateway.method_display_name(), "Azure AD");
        }
    }

    #[tokio::test]
    async fn disabled_gateway_passes_through_as_guest() {
        let gateway = Gateway::from_config(&config_with_method("none")).expect("gateway");
        let sid = generate_session_id();

        let outcome = gateway.require_auth(&sid, None, None, "/").await;
        assert_eq!(outcome, AuthOutcome::Continue);
        assert!(gateway.is_authenticated(&sid));

        let user = gateway.current_user(&sid).expect("guest");
        assert_eq!(user.username, "guest");
        assert_eq!(user.name, "Guest");
        assert_eq!(user.email, "");
    }

    #[tokio::test]
    async fn unconfigured_federated_gateway_fails_open() {
        // Method selected but no tenant/client/secret: requests pass.
        let gateway = Gateway::from_config(&config_with_method("azure")).expect("gateway");
        let sid = generate_session_id();
        let outcome = gateway.require_auth(&sid, None, None, "/").await;
        assert_eq!(outcome, AuthOutcome::Continue);
        // Fail-open is not authentication: there is no current user.
        assert!(gateway.current_user(&sid).is_none());
    }

    #[test]
    fn federated_current_user_reflects_the_session() {
        let gateway = Gateway::from_config(&config_with_method("azure")).expect("gateway");
        let sid = generate_session_id();
        assert!(gateway.current_user(&sid).is_none());

        let mut data = SessionData::default();
        data.federated = Some(FederatedSession {
            identity: authgate_access::FederatedIdentity {
                id: "1".to_string(),
                display_name: "Jane".to_string(),
                email: "jane@example.com".to_string(),
                user_principal_name: "jane@example.com".to_string(),
            },
            access_token: "abc".to_string(),
            token_expires_at: Utc::now() + Duration::seconds(60),
        });
        gateway.store.save(&sid, data);

        let user = gateway.current_user(&sid).expect("user");
        assert_eq!(user.name, "Jane");
        assert!(gateway.is_authenticated(&sid));

        gateway.logout(&sid);
        assert!(gateway.current_user(&sid).is_none());
        // Logout of an already-cleared session is a no-op.
        gateway.logout(&sid);
    }

    #[cfg(feature = "directory")]
    #[test]
    fn directory_current_user_expires_with_the_session() {
        let gateway = Gateway::from_config(&config_with_method("ldap")).expect("gateway");
        let sid = generate_session_id();

        let identity = authgate_access::DirectoryIdentity {
            distinguished_name: "CN=Jane Doe,OU=Users,DC=example,DC=com".to_string(),
            username: "jdoe".to_string(),
            display_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            user_principal_name: "jdoe@example.com".to_string(),
        };
        let mut data = SessionData::default();
        data.directory = Some(DirectorySession {
            identity: identity.clone(),
            authenticated: true,
            login_at: Utc::now(),
        });
        gateway.store.save(&sid, data.clone());
        assert_eq!(
            gateway.current_user(&sid).expect("user").username,
            "jdoe"
        );

        data.directory = Some(DirectorySession {
            identity,
            authenticated: true,
            login_at: Utc::now() - Duration::seconds(28_801),
        });
        gateway.store.save(&sid, data);
        assert!(gateway.current_user(&sid).is_none());
        assert!(!gateway.is_authenticated(&sid));
    }
}
