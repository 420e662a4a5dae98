//! Typed authentication outcomes.
//!
//! A strategy never terminates the request inline. Its `require_auth` returns
//! an [`AuthOutcome`] that the outer request handler interprets: pass the
//! request through, redirect, render the login form, or deny. This keeps the
//! decision logic testable without a live HTTP response sink.

use serde::{Deserialize, Serialize};

/// The decision a strategy makes for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The request is authenticated (or authentication is disabled or not
    /// fully configured); the wrapped application runs.
    Continue,
    /// Send the client elsewhere and stop processing. Used for the
    /// provider's authorization URL and for the query-stripping redirect
    /// after a handled callback or login, so codes and tokens never linger
    /// in browser history.
    Redirect(String),
    /// Present the login form and stop processing; the wrapped application
    /// must not execute.
    Render(LoginForm),
    /// Authentication failed in a way re-prompting cannot fix. The message
    /// is client-safe; internal detail has already been logged.
    Denied(String),
}

/// Data contract of the login form.
///
/// Rendering is the caller's concern; the form is presented with an optional
/// error banner and submits `{username, password}` via a same-path POST.
/// Any other request shape is not a valid submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    /// Validation or denial message to show above the fields.
    pub error_message: Option<String>,
}

impl LoginForm {
    /// A fresh form with no error.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A form re-presented with an error message.
    #[must_use]
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
        }
    }
}

/// A submitted login form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginSubmission {
    /// The submitted username, whitespace-trimmed by the caller.
    pub username: String,
    /// The submitted password, passed through verbatim.
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_form_has_no_error() {
        assert_eq!(LoginForm::empty().error_message, None);
    }

    #[test]
    fn form_with_error_carries_message() {
        let form = LoginForm::with_error("Invalid username or password");
        assert_eq!(
            form.error_message.as_deref(),
            Some("Invalid username or password")
        );
    }
}
