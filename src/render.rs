//! HTML pages built from `templates/` with `{{KEY}}` placeholders.
//!
//! Every user-supplied value passes through [`escape`] before substitution.
//! Placeholders ending in `_ERROR` or named `ALERT`/`CONTENT`/`OUTCOME` take
//! pre-rendered fragments.

use axum::response::Html;

use crate::auth::callback::{SUCCESS_REDIRECT, SUCCESS_REDIRECT_DELAY};
use crate::cooldown::format_countdown;
use crate::forms::{FieldErrors, SignUpForm};
use crate::supabase::User;

const LAYOUT: &str = include_str!("../templates/layout.html");
const HOME: &str = include_str!("../templates/home.html");
const DASHBOARD: &str = include_str!("../templates/dashboard.html");
const LOGIN: &str = include_str!("../templates/login.html");
const SIGNUP: &str = include_str!("../templates/signup.html");
const VERIFY: &str = include_str!("../templates/verify.html");
const CALLBACK: &str = include_str!("../templates/callback.html");
const CALLBACK_RESULT: &str = include_str!("../templates/callback_result.html");

pub const SIGN_UP_SUCCESS: &str = "Account created. Check your email to verify before logging in.";

#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            _ => out.push(c),
        }
    }
    out
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |page, (key, value)| page.replace(&format!("{{{{{key}}}}}"), value))
}

fn page(title: &str, head: &str, body: &str) -> Html<String> {
    Html(fill(LAYOUT, &[("HEAD", head), ("TITLE", &escape(title)), ("BODY", body)]))
}

/// Alert paragraph, or nothing.
#[derive(Debug, Clone, Copy)]
pub enum Alert<'a> {
    None,
    Error(&'a str),
    Success(&'a str),
}

impl Alert<'_> {
    fn render(self) -> String {
        match self {
            Self::None => String::new(),
            Self::Error(msg) => format!(r#"<p class="error" role="alert">{}</p>"#, escape(msg)),
            Self::Success(msg) => format!(r#"<p class="success" role="status">{}</p>"#, escape(msg)),
        }
    }
}

fn field_error(errors: Option<&FieldErrors>, field: &str) -> String {
    errors
        .and_then(|e| e.get(field))
        .map(|msg| format!(r#"<p class="field-error">{}</p>"#, escape(msg)))
        .unwrap_or_default()
}

fn display_name(user: &User) -> String {
    match (user.metadata_str("first_name"), user.metadata_str("last_name")) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_owned(),
        _ => user.email.clone().unwrap_or_else(|| "there".to_owned()),
    }
}

// =============================================================================
// PAGES
// =============================================================================

#[must_use]
pub fn home(user: Option<&User>, alert: Alert<'_>) -> Html<String> {
    let content = match user.and_then(|u| u.email.as_deref()) {
        Some(email) => format!(
            concat!(
                r#"<p>Signed in as {}.</p>"#,
                r#"<p><a href="/dashboard">Go to your dashboard</a></p>"#,
                r#"<form method="post" action="/auth/logout"><button type="submit">Sign out</button></form>"#,
            ),
            escape(email)
        ),
        None => r#"<p><a href="/auth/google">Continue with Google</a></p>"#.to_owned(),
    };
    page("Home", "", &fill(HOME, &[("ALERT", &alert.render()), ("CONTENT", &content)]))
}

#[must_use]
pub fn dashboard(user: &User) -> Html<String> {
    let email = user.email.as_deref().unwrap_or("unknown email");
    let body = fill(DASHBOARD, &[("NAME", &escape(&display_name(user))), ("EMAIL", &escape(email))]);
    page("Dashboard", "", &body)
}

#[must_use]
pub fn login(email: &str, redirect: Option<&str>, errors: Option<&FieldErrors>, alert: Alert<'_>) -> Html<String> {
    let body = fill(
        LOGIN,
        &[
            ("ALERT", &alert.render()),
            ("REDIRECT", &escape(redirect.unwrap_or_default())),
            ("EMAIL", &escape(email)),
            ("EMAIL_ERROR", &field_error(errors, "email")),
            ("PASSWORD_ERROR", &field_error(errors, "password")),
        ],
    );
    page("Sign in", "", &body)
}

/// Sign-up page. Passwords are never echoed back.
#[must_use]
pub fn signup(form: &SignUpForm, errors: Option<&FieldErrors>, alert: Alert<'_>) -> Html<String> {
    let body = fill(
        SIGNUP,
        &[
            ("ALERT", &alert.render()),
            ("FIRST_NAME", &escape(&form.first_name)),
            ("LAST_NAME", &escape(&form.last_name)),
            ("EMAIL", &escape(&form.email)),
            ("FIRST_NAME_ERROR", &field_error(errors, "first_name")),
            ("LAST_NAME_ERROR", &field_error(errors, "last_name")),
            ("EMAIL_ERROR", &field_error(errors, "email")),
            ("PASSWORD_ERROR", &field_error(errors, "password")),
            ("CONFIRM_PASSWORD_ERROR", &field_error(errors, "confirm_password")),
        ],
    );
    page("Sign up", "", &body)
}

#[must_use]
pub fn verify(email: Option<&str>, remaining_secs: u64, alert: Alert<'_>) -> Html<String> {
    let countdown = format_countdown(remaining_secs);
    let (disabled, label) = if remaining_secs > 0 {
        (" disabled", format!("Resend available in {countdown}"))
    } else {
        ("", "Resend email".to_owned())
    };
    let body = fill(
        VERIFY,
        &[
            ("EMAIL_VALUE", &escape(email.unwrap_or_default())),
            ("EMAIL", &escape(email.unwrap_or("your email"))),
            ("COUNTDOWN", &countdown),
            ("ALERT", &alert.render()),
            ("RESEND_DISABLED", disabled),
            ("RESEND_LABEL", &label),
        ],
    );
    page("Verify your email", "", &body)
}

/// Shell that posts the full browser URL, fragment included, back to the
/// server.
#[must_use]
pub fn callback_shell() -> Html<String> {
    page("Signing you in", "", CALLBACK)
}

/// Outcome of a callback resolution. Success refreshes to the dashboard
/// after a short pause.
#[must_use]
pub fn callback_result(outcome: Result<(), &str>) -> Html<String> {
    match outcome {
        Ok(()) => {
            let delay = SUCCESS_REDIRECT_DELAY.as_secs_f64();
            let head = format!(r#"<meta http-equiv="refresh" content="{delay};url={SUCCESS_REDIRECT}">"#);
            let body = fill(
                CALLBACK_RESULT,
                &[("OUTCOME", r#"<p class="success" role="status">Authentication successful. Redirecting…</p>"#)],
            );
            page("Signing you in", &head, &body)
        }
        Err(message) => {
            let outcome = format!(
                concat!(
                    r#"<p class="error" role="alert">We couldn’t complete the sign-in. {}</p>"#,
                    r#"<p><a href="/auth/login">Back to login</a></p>"#,
                ),
                escape(message)
            );
            page("Signing you in", "", &fill(CALLBACK_RESULT, &[("OUTCOME", &outcome)]))
        }
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
