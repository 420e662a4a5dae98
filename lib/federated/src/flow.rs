//! The federated authentication state machine.
//!
//! Per-request decision flow: a callback in flight is handled first (and
//! always answered with a query-stripping redirect on success), otherwise an
//! unauthenticated or expired session is redirected to the provider, and a
//! valid session passes through.

use chrono::{Duration, Utc};
use tracing::{error, warn};

use crate::client::FederatedClient;
use crate::config::FederatedConfig;
use crate::error::FederatedError;
use authgate_access::{
    AuthOutcome, FederatedSession, GroupAllowList, SessionData, SessionId, SessionStore,
};

/// The `code`/`state` query parameters of an inbound request.
///
/// A callback is in flight only when both parameters are present; a request
/// carrying just one of them (an application's own `?state=` parameter, for
/// example) is handled as an ordinary request, not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    /// The authorization code issued by the provider.
    pub code: Option<String>,
    /// The CSRF state nonce echoed back by the provider.
    pub state: Option<String>,
}

impl CallbackQuery {
    /// True when both callback parameters are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.code.is_some() && self.state.is_some()
    }
}

/// Drives the federated strategy for each request.
#[derive(Debug)]
pub struct FederatedFlow {
    client: FederatedClient,
    allow_list: GroupAllowList,
    enabled: bool,
}

impl FederatedFlow {
    /// Binds the flow to its configuration.
    #[must_use]
    pub fn new(config: FederatedConfig) -> Self {
        let enabled = config.is_enabled();
        let allow_list = config.allow_list();
        Self {
            client: FederatedClient::new(config),
            allow_list,
            enabled,
        }
    }

    /// True when the provider configuration is complete enough to enforce.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Makes the authentication decision for one request.
    ///
    /// `path` is the request path already stripped of query parameters; it is
    /// the redirect target after a handled callback so codes and state never
    /// survive in browser history.
    pub async fn require_auth(
        &self,
        store: &dyn SessionStore,
        session_id: &SessionId,
        callback: Option<CallbackQuery>,
        path: &str,
    ) -> AuthOutcome {
        // Misconfigured-but-selected provider fails open. The startup
        // warning is the operator's signal that enforcement is off.
        if !self.enabled {
            return AuthOutcome::Continue;
        }

        if let Some(query) = callback.filter(CallbackQuery::is_complete) {
            return match self.handle_callback(store, session_id, query).await {
                // The redirect must happen even on success, before any body.
                Ok(()) => AuthOutcome::Redirect(path.to_string()),
                Err(err) => {
                    match &err {
                        FederatedError::AccessDenied => {
                            warn!(session = %session_id, "federated access denied: user not in an allowed group");
                        }
                        other => {
                            error!(session = %session_id, error = %other, "federated callback failed");
                        }
                    }
                    AuthOutcome::Denied(err.client_message().to_string())
                }
            };
        }

        let data = store.load(session_id).unwrap_or_default();
        match &data.federated {
            Some(session) if !session.is_expired(Utc::now()) => AuthOutcome::Continue,
            Some(_) => {
                // Token expired: full re-authentication round trip, no
                // silent refresh.
                let mut data = data;
                data.federated = None;
                self.redirect_to_provider(store, session_id, data)
            }
            None => self.redirect_to_provider(store, session_id, data),
        }
    }

    fn redirect_to_provider(
        &self,
        store: &dyn SessionStore,
        session_id: &SessionId,
        mut data: SessionData,
    ) -> AuthOutcome {
        match self.client.authorization_url() {
            Ok((url, state)) => {
                data.oauth_state = Some(state);
                store.save(session_id, data);
                AuthOutcome::Redirect(url)
            }
            Err(err) => {
                error!(error = %err, "could not build provider authorization URL");
                AuthOutcome::Denied(err.client_message().to_string())
            }
        }
    }

    /// Completes the authorization-code exchange for a callback request.
    ///
    /// On success the session holds the normalized identity, the raw access
    /// token, and its absolute expiry.
    pub async fn handle_callback(
        &self,
        store: &dyn SessionStore,
        session_id: &SessionId,
        query: CallbackQuery,
    ) -> Result<(), FederatedError> {
        let (code, state) = match (query.code, query.state) {
            (Some(code), Some(state)) => (code, state),
            _ => return Err(FederatedError::InvalidCallback),
        };

        // The pending nonce is single-use: consume it before comparing so a
        // replayed state fails even if the first use matched.
        let mut data = store.load(session_id).unwrap_or_default();
        let pending = data.oauth_state.take();
        store.save(session_id, data.clone());

        if pending.as_deref() != Some(state.as_str()) {
            return Err(FederatedError::CsrfMismatch);
        }

        let grant = self.client.exchange_code(&code).await?;
        let identity = self.client.fetch_profile(&grant.access_token).await?;

        if !self.allow_list.is_unrestricted() {
            let groups = match self.client.fetch_groups(&grant.access_token).await {
                Ok(groups) => groups,
                Err(err) => {
                    // Failed group lookup means no provable membership.
                    warn!(error = %err, "group lookup failed, treating user as having no memberships");
                    Vec::new()
                }
            };
            if !self.allow_list.permits_exact(&groups) {
                return Err(FederatedError::AccessDenied);
            }
        }

        data.federated = Some(FederatedSession {
            identity,
            access_token: grant.access_token,
            token_expires_at: Utc::now() + Duration::seconds(grant.expires_in_seconds as i64),
        });
        store.save(session_id, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_access::{MemorySessionStore, generate_session_id};
    use axum::extract::Query;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::json;

    fn callback(code: &str, state: &str) -> CallbackQuery {
        CallbackQuery {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
        }
    }

    /// Stub identity provider: token endpoint plus profile/group API.
    async fn spawn_provider() -> String {
        #[derive(Deserialize)]
        struct PageQuery {
            page: Option<u32>,
        }

        let router = Router::new()
            .route(
                "/contoso/oauth2/v2.0/token",
                post(|| async {
                    Json(json!({
                        "access_token": "abc",
                        "token_type": "Bearer",
                        "expires_in": 1000
                    }))
                }),
            )
            .route(
                "/graph/me",
                get(|| async {
                    Json(json!({
                        "id": "1",
                        "displayName": "Jane",
                        "mail": "jane@x.com",
                        "userPrincipalName": "jane@x.com"
                    }))
                }),
            )
            .route(
                "/graph/me/memberOf",
                get(move |Query(q): Query<PageQuery>, base: axum::Extension<String>| async move {
                    match q.page {
                        None => Json(json!({
                            "value": [{"id": "group-first-page"}],
                            "@odata.nextLink": format!("{}/graph/me/memberOf?page=2", base.0)
                        })),
                        Some(_) => Json(json!({
                            "value": [{"id": "group-second-page"}]
                        })),
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub provider");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let app = router.layer(axum::Extension(base.clone()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub provider");
        });
        base
    }

    fn stub_config(base: &str, allowed_groups: &str) -> FederatedConfig {
        FederatedConfig::new(
            "contoso".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/".to_string(),
        )
        .with_allowed_groups(allowed_groups.to_string())
        .with_endpoints(base.to_string(), format!("{base}/graph"))
    }

    #[tokio::test]
    async fn disabled_provider_fails_open() {
        let flow = FederatedFlow::new(FederatedConfig::default());
        let store = MemorySessionStore::new();
        let sid = generate_session_id();
        let outcome = flow.require_auth(&store, &sid, None, "/").await;
        assert_eq!(outcome, AuthOutcome::Continue);
        // Fail-open leaves no session state behind.
        assert!(store.load(&sid).is_none());
    }

    #[tokio::test]
    async fn unauthenticated_request_redirects_to_provider_with_state() {
        let flow = FederatedFlow::new(stub_config("http://127.0.0.1:9", ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let outcome = flow.require_auth(&store, &sid, None, "/").await;
        let AuthOutcome::Redirect(url) = outcome else {
            panic!("expected redirect, got {outcome:?}");
        };
        assert!(url.contains("/contoso/oauth2/v2.0/authorize"));
        assert!(url.contains("response_type=code"));

        let state = store
            .load(&sid)
            .and_then(|d| d.oauth_state)
            .expect("pending nonce stored");
        assert!(url.contains(&state));
    }

    #[tokio::test]
    async fn lone_callback_parameter_is_not_a_callback() {
        let flow = FederatedFlow::new(stub_config("http://127.0.0.1:9", ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        // An application request with its own `?state=` parameter gets the
        // normal unauthenticated redirect, not a denial.
        let query = CallbackQuery {
            code: None,
            state: Some("application-value".to_string()),
        };
        let outcome = flow.require_auth(&store, &sid, Some(query), "/").await;
        let AuthOutcome::Redirect(url) = outcome else {
            panic!("expected redirect, got {outcome:?}");
        };
        assert!(url.contains("/oauth2/v2.0/authorize"));

        let query = CallbackQuery {
            code: Some("application-value".to_string()),
            state: None,
        };
        let outcome = flow.require_auth(&store, &sid, Some(query), "/").await;
        assert!(matches!(outcome, AuthOutcome::Redirect(_)));
    }

    #[tokio::test]
    async fn callback_missing_code_is_invalid() {
        let flow = FederatedFlow::new(stub_config("http://127.0.0.1:9", ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let query = CallbackQuery {
            code: None,
            state: Some("s".to_string()),
        };
        let err = flow
            .handle_callback(&store, &sid, query)
            .await
            .expect_err("invalid callback");
        assert_eq!(err, FederatedError::InvalidCallback);
    }

    #[tokio::test]
    async fn mismatched_state_is_rejected_and_nonce_consumed() {
        let flow = FederatedFlow::new(stub_config("http://127.0.0.1:9", ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let mut data = SessionData::default();
        data.oauth_state = Some("expected".to_string());
        store.save(&sid, data);

        let err = flow
            .handle_callback(&store, &sid, callback("c", "forged"))
            .await
            .expect_err("csrf mismatch");
        assert_eq!(err, FederatedError::CsrfMismatch);

        // The nonce is cleared regardless of match outcome.
        assert_eq!(store.load(&sid).expect("session").oauth_state, None);
    }

    #[tokio::test]
    async fn successful_callback_populates_session_and_redirects() {
        let base = spawn_provider().await;
        let flow = FederatedFlow::new(stub_config(&base, ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let mut data = SessionData::default();
        data.oauth_state = Some("nonce".to_string());
        store.save(&sid, data);

        let before = Utc::now();
        let outcome = flow
            .require_auth(&store, &sid, Some(callback("code", "nonce")), "/app")
            .await;
        assert_eq!(outcome, AuthOutcome::Redirect("/app".to_string()));

        let session = store
            .load(&sid)
            .and_then(|d| d.federated)
            .expect("federated session populated");
        assert_eq!(session.access_token, "abc");
        assert_eq!(session.identity.display_name, "Jane");
        assert_eq!(session.identity.email, "jane@x.com");

        // Expiry is now + the declared 1000 second lifetime.
        let lifetime = (session.token_expires_at - before).num_seconds();
        assert!((995..=1005).contains(&lifetime), "lifetime was {lifetime}");

        // A subsequent request with the valid session passes through.
        let outcome = flow.require_auth(&store, &sid, None, "/app").await;
        assert_eq!(outcome, AuthOutcome::Continue);
    }

    #[tokio::test]
    async fn replayed_state_fails_after_successful_use() {
        let base = spawn_provider().await;
        let flow = FederatedFlow::new(stub_config(&base, ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let mut data = SessionData::default();
        data.oauth_state = Some("nonce".to_string());
        store.save(&sid, data);

        flow.handle_callback(&store, &sid, callback("code", "nonce"))
            .await
            .expect("first use succeeds");

        let err = flow
            .handle_callback(&store, &sid, callback("code", "nonce"))
            .await
            .expect_err("replay must fail");
        assert_eq!(err, FederatedError::CsrfMismatch);
    }

    #[tokio::test]
    async fn allow_list_gates_on_group_ids_across_pages() {
        let base = spawn_provider().await;
        let store = MemorySessionStore::new();

        // Group only present on the second page: pagination must be followed.
        let flow = FederatedFlow::new(stub_config(&base, "group-second-page"));
        let sid = generate_session_id();
        let mut data = SessionData::default();
        data.oauth_state = Some("nonce".to_string());
        store.save(&sid, data);
        flow.handle_callback(&store, &sid, callback("code", "nonce"))
            .await
            .expect("authorized via second page");

        // A non-member is denied.
        let flow = FederatedFlow::new(stub_config(&base, "group-unrelated"));
        let sid = generate_session_id();
        let mut data = SessionData::default();
        data.oauth_state = Some("nonce".to_string());
        store.save(&sid, data);
        let err = flow
            .handle_callback(&store, &sid, callback("code", "nonce"))
            .await
            .expect_err("denied");
        assert_eq!(err, FederatedError::AccessDenied);
        // Denied users get no session.
        assert!(store.load(&sid).expect("session").federated.is_none());
    }

    #[tokio::test]
    async fn expired_token_restarts_authentication() {
        let flow = FederatedFlow::new(stub_config("http://127.0.0.1:9", ""));
        let store = MemorySessionStore::new();
        let sid = generate_session_id();

        let mut data = SessionData::default();
        data.federated = Some(FederatedSession {
            identity: authgate_access::FederatedIdentity {
                id: "1".to_string(),
                display_name: "Jane".to_string(),
                email: "jane@x.com".to_string(),
                user_principal_name: "jane@x.com".to_string(),
            },
            access_token: "stale".to_string(),
            token_expires_at: Utc::now() - Duration::seconds(1),
        });
        store.save(&sid, data);

        let outcome = flow.require_auth(&store, &sid, None, "/").await;
        let AuthOutcome::Redirect(url) = outcome else {
            panic!("expected redirect, got {outcome:?}");
        };
        assert!(url.contains("/oauth2/v2.0/authorize"));

        // The stale federated session was cleared and a new nonce stored.
        let data = store.load(&sid).expect("session");
        assert!(data.federated.is_none());
        assert!(data.oauth_state.is_some());
    }
}
