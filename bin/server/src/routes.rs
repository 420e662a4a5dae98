//! The request gate in front of the wrapped application.
//!
//! Every request except `/health` lands in [`gate`]. The handler reads or
//! mints the session cookie, hands logout and the strategy-specific inputs
//! to the [`Gateway`](crate::gateway::Gateway), and turns the resulting
//! [`AuthOutcome`] into an HTTP response. The wrapped application only runs
//! on `Continue`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Form, FromRequest, Query, Request, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration as TimeDuration;
use tracing::debug;

use crate::config::SessionConfig;
use crate::forms;
use crate::gateway::Gateway;
use authgate_access::{AuthOutcome, LoginSubmission, SessionId, generate_session_id};
use authgate_core::AuthUser;
use authgate_federated::CallbackQuery;

/// Session cookie name.
const SESSION_COOKIE: &str = "session";

/// Shared state behind every request handler.
pub struct AppState {
    /// The per-process authentication gateway.
    pub gateway: Gateway,
    /// Session cookie configuration.
    pub session: SessionConfig,
}

/// Query parameters the gate itself interprets. Anything else passes through
/// to the wrapped application untouched.
#[derive(Debug, Default, Deserialize)]
pub struct GateQuery {
    /// Federated callback authorization code.
    pub code: Option<String>,
    /// Federated callback CSRF state.
    pub state: Option<String>,
    /// Present (even valueless, as `?logout`) to end the session.
    pub logout: Option<String>,
}

/// Liveness probe, served without authentication.
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Fallback handler gating every application request.
pub async fn gate(State(state): State<Arc<AppState>>, jar: CookieJar, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let query = Query::<GateQuery>::try_from_uri(req.uri())
        .map(|Query(query)| query)
        .unwrap_or_default();

    // Read the session cookie, minting one on first contact.
    let (session_id, jar) = match jar.get(SESSION_COOKIE) {
        Some(cookie) => (SessionId::from(cookie.value()), jar),
        None => {
            let session_id = generate_session_id();
            debug!(session = %session_id, "minted new session");
            let cookie = Cookie::build((SESSION_COOKIE, session_id.as_str().to_string()))
                .path("/")
                .http_only(true)
                .secure(state.session.secure_cookies)
                .same_site(SameSite::Lax);
            let jar = jar.add(cookie);
            (session_id, jar)
        }
    };

    if query.logout.is_some() {
        return logout_response(&state, jar, &session_id);
    }

    let callback = callback_from(query);
    let submission = if req.method() == Method::POST {
        Form::<LoginSubmission>::from_request(req, &())
            .await
            .ok()
            .map(|Form(submission)| submission)
    } else {
        None
    };

    let outcome = state
        .gateway
        .require_auth(&session_id, callback, submission, &path)
        .await;

    let response = match outcome {
        AuthOutcome::Continue => {
            let user = state
                .gateway
                .current_user(&session_id)
                .unwrap_or_else(AuthUser::guest);
            Html(forms::app_page(&user, state.gateway.method_display_name())).into_response()
        }
        // Redirect::to answers 303, so a login POST is never resubmitted on
        // refresh and callback parameters never linger in browser history.
        AuthOutcome::Redirect(url) => Redirect::to(&url).into_response(),
        AuthOutcome::Render(form) => (
            StatusCode::OK,
            Html(forms::login_page(&form, state.gateway.method_display_name())),
        )
            .into_response(),
        AuthOutcome::Denied(message) => {
            (StatusCode::FORBIDDEN, Html(forms::denied_page(&message))).into_response()
        }
    };

    (jar, response).into_response()
}

/// Ends the session and clears the session cookie plus any configured
/// application cookies.
fn logout_response(state: &AppState, jar: CookieJar, session_id: &SessionId) -> Response {
    state.gateway.logout(session_id);

    let mut jar = jar.add(removal_cookie(SESSION_COOKIE.to_string()));
    for name in state.session.aux_cookie_names() {
        jar = jar.add(removal_cookie(name));
    }
    (jar, Redirect::to("/")).into_response()
}

/// Treats the request as a provider callback only when both `code` and
/// `state` arrived; a lone parameter belongs to the wrapped application.
fn callback_from(query: GateQuery) -> Option<CallbackQuery> {
    (query.code.is_some() && query.state.is_some()).then(|| CallbackQuery {
        code: query.code,
        state: query.state,
    })
}

fn removal_cookie(name: String) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}
