//! HTML for the login form and the pages the gateway serves itself.
//!
//! Rendering is deliberately plain string assembly; the only dynamic values
//! are escaped before insertion.

use authgate_access::LoginForm;
use authgate_core::AuthUser;

/// Escapes text for safe insertion into HTML content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders the login form, with an error banner when one is set.
///
/// The form posts `{username, password}` back to the same path.
#[must_use]
pub fn login_page(form: &LoginForm, method_name: &str) -> String {
    let banner = form
        .error_message
        .as_deref()
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<h1>Sign in</h1>
<p>Authentication method: {method}</p>
{banner}
<form method="post">
<label>Username <input type="text" name="username" autocomplete="username" autofocus></label><br>
<label>Password <input type="password" name="password" autocomplete="current-password"></label><br>
<p class="hint">Use your domain username (e.g., jdoe)</p>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
        method = escape(method_name),
        banner = banner,
    )
}

/// Renders the wrapped application's landing page for an authenticated (or
/// guest) user.
#[must_use]
pub fn app_page(user: &AuthUser, method_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Home</title></head>
<body>
<h1>Welcome, {name}</h1>
<p>Signed in as {username} ({email}) via {method}</p>
<p><a href="?logout">Sign out</a></p>
</body>
</html>
"#,
        name = escape(&user.name),
        username = escape(&user.username),
        email = escape(&user.email),
        method = escape(method_name),
    )
}

/// Renders a terminal denial page.
#[must_use]
pub fn denied_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Access denied</title></head>
<body>
<h1>Access denied</h1>
<p>{}</p>
<p><a href="?logout">Sign out</a></p>
</body>
</html>
"#,
        escape(message),
    )
}
