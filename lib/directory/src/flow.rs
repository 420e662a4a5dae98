//! The directory authentication state machine.
//!
//! A POST carrying `{username, password}` is a login attempt; everything
//! else either passes through on a live session or gets the login form.
//! Failed attempts re-present the form with a client-safe message, and an
//! expired session is cleared and re-prompted.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::client::DirectoryClient;
use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use authgate_access::{
    AuthOutcome, DirectorySession, LoginForm, LoginSubmission, SessionId, SessionStore,
};

/// Message shown when a session passes its inactivity window.
const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Drives the directory strategy for each request.
#[derive(Debug)]
pub struct DirectoryFlow {
    client: DirectoryClient,
    session_timeout_seconds: u64,
    enabled: bool,
}

impl DirectoryFlow {
    /// Binds the flow to its configuration.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let enabled = config.is_enabled();
        let session_timeout_seconds = config.session_timeout_seconds();
        Self {
            client: DirectoryClient::new(config),
            session_timeout_seconds,
            enabled,
        }
    }

    /// True when the directory configuration is complete enough to enforce.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The configured flat session lifetime.
    #[must_use]
    pub fn session_timeout_seconds(&self) -> u64 {
        self.session_timeout_seconds
    }

    /// Makes the authentication decision for one request.
    ///
    /// `path` is the redirect target after a successful login, so the POST
    /// is answered with a redirect and a refresh cannot resubmit credentials.
    pub async fn require_auth(
        &self,
        store: &dyn SessionStore,
        session_id: &SessionId,
        submission: Option<LoginSubmission>,
        path: &str,
    ) -> AuthOutcome {
        // Misconfigured-but-selected directory fails open. The startup
        // warning is the operator's signal that enforcement is off.
        if !self.enabled {
            return AuthOutcome::Continue;
        }

        if let Some(submission) = submission {
            return self.handle_login(store, session_id, &submission, path).await;
        }

        let data = store.load(session_id).unwrap_or_default();
        match &data.directory {
            Some(session) if session.authenticated => {
                if session.is_expired(Utc::now(), self.session_timeout_seconds) {
                    let mut data = data;
                    data.directory = None;
                    store.save(session_id, data);
                    AuthOutcome::Render(LoginForm::with_error(SESSION_EXPIRED_MESSAGE))
                } else {
                    AuthOutcome::Continue
                }
            }
            _ => AuthOutcome::Render(LoginForm::empty()),
        }
    }

    async fn handle_login(
        &self,
        store: &dyn SessionStore,
        session_id: &SessionId,
        submission: &LoginSubmission,
        path: &str,
    ) -> AuthOutcome {
        match self
            .client
            .authenticate(&submission.username, &submission.password)
            .await
        {
            Ok(identity) => {
                info!(username = %identity.username, session = %session_id, "directory login succeeded");
                let mut data = store.load(session_id).unwrap_or_default();
                data.directory = Some(DirectorySession {
                    identity,
                    authenticated: true,
                    login_at: Utc::now(),
                });
                store.save(session_id, data);
                AuthOutcome::Redirect(path.to_string())
            }
            Err(err) => {
                match &err {
                    DirectoryError::AccessDenied => {
                        warn!(username = %submission.username, "directory access denied: user not in an allowed group");
                    }
                    DirectoryError::MissingCredentials | DirectoryError::InvalidCredentials => {
                        info!(username = %submission.username, "directory login rejected");
                    }
                    other => {
                        error!(username = %submission.username, error = %other, "directory login failed");
                    }
                }
                AuthOutcome::Render(LoginForm::with_error(err.client_message()))
            }
        }
    }
}
