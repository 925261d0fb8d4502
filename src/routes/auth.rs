//! Auth routes: password login, sign-up, email verification, Google OAuth
//! start and logout.

use axum::Form;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::cooldown::ceil_secs;
use crate::forms::{LoginForm, SignUpForm, safe_redirect};
use crate::guard::{DASHBOARD_PATH, LOGIN_PATH};
use crate::render::{self, Alert, SIGN_UP_SUCCESS};
use crate::routes::provider_error_status;
use crate::state::AppState;
use crate::supabase::{StoredAuth, VerifyType, storage};

const RESEND_SENT: &str = "Verification email sent.";

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Deserialize)]
pub struct LoginQuery {
    redirect: Option<String>,
}

/// `GET /auth/login`
pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    render::login("", query.redirect.as_deref(), None, Alert::None).into_response()
}

/// `POST /auth/login`: password sign-in, then back to where the guard
/// stopped the user.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let redirect = form.redirect.as_deref().filter(|r| !r.is_empty());
    if let Err(errors) = form.validate() {
        let page = render::login(&form.email, redirect, Some(&errors), Alert::None);
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let ctx = state.auth_context(&jar).await;
    match ctx.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "password sign-in");
            let jar = state.persist(jar, ctx.client());
            let target = safe_redirect(redirect).unwrap_or(DASHBOARD_PATH);
            (jar, Redirect::to(target)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "password sign-in failed");
            let page = render::login(&form.email, redirect, None, Alert::Error(&e.to_string()));
            (provider_error_status(&e), page).into_response()
        }
    }
}

// =============================================================================
// SIGN-UP
// =============================================================================

/// `GET /auth/signup`
pub async fn signup_page() -> Response {
    render::signup(&SignUpForm::default(), None, Alert::None).into_response()
}

/// `POST /auth/signup`: validate locally, register with the provider and
/// start the resend cooldown.
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Form(form): Form<SignUpForm>) -> Response {
    if let Err(errors) = form.validate() {
        let page = render::signup(&form, Some(&errors), Alert::None);
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let ctx = state.auth_context(&jar).await;
    let result = ctx.sign_up(&form.email, &form.password, &form.first_name, &form.last_name).await;
    let jar = state.persist(jar, ctx.client());
    match result {
        Ok(outcome) => {
            if let Some(user) = &outcome.user {
                tracing::info!(user_id = %user.id, "account created");
            }
            state.resend_cooldown.start(&form.email);
            (jar, render::signup(&SignUpForm::default(), None, Alert::Success(SIGN_UP_SUCCESS))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "sign-up failed");
            let page = render::signup(&form, None, Alert::Error(&e.to_string()));
            (provider_error_status(&e), jar, page).into_response()
        }
    }
}

// =============================================================================
// VERIFY
// =============================================================================

#[derive(Deserialize)]
pub struct VerifyQuery {
    email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResendForm {
    #[serde(default)]
    email: String,
}

/// `GET /auth/verify`: countdown until a resend is allowed. Without a
/// known email the full window is shown.
pub async fn verify_page(State(state): State<AppState>, jar: CookieJar, Query(query): Query<VerifyQuery>) -> Response {
    let ctx = state.auth_context(&jar).await;
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .or_else(|| ctx.current_user().and_then(|u| u.email));
    let remaining = match &email {
        Some(email) => ceil_secs(state.resend_cooldown.remaining(email)),
        None => state.resend_cooldown.window().as_secs(),
    };
    let jar = state.persist(jar, ctx.client());
    (jar, render::verify(email.as_deref(), remaining, Alert::None)).into_response()
}

/// `POST /auth/verify/resend`: re-send the sign-up confirmation once the
/// cooldown is over. Does nothing without an email.
pub async fn resend_verification(State(state): State<AppState>, jar: CookieJar, Form(form): Form<ResendForm>) -> Response {
    let email = form.email.trim();
    if email.is_empty() {
        let window = state.resend_cooldown.window().as_secs();
        return render::verify(None, window, Alert::None).into_response();
    }

    if let Err(e) = state.resend_cooldown.check(email) {
        tracing::debug!(error = %e, "resend refused");
        let page = render::verify(Some(email), e.remaining_secs, Alert::None);
        return (StatusCode::TOO_MANY_REQUESTS, page).into_response();
    }

    let client = state.session_client(&jar);
    let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    let redirect_to = format!("{}?email={encoded}", state.config.callback_url());
    match client.resend(email, VerifyType::Signup, Some(&redirect_to)).await {
        Ok(()) => {
            state.resend_cooldown.start(email);
            let window = state.resend_cooldown.window().as_secs();
            render::verify(Some(email), window, Alert::Success(RESEND_SENT)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "verification resend failed");
            let page = render::verify(Some(email), 0, Alert::Error(&e.to_string()));
            (provider_error_status(&e), page).into_response()
        }
    }
}

// =============================================================================
// OAUTH & LOGOUT
// =============================================================================

/// `GET /auth/google`: store a PKCE verifier and hand off to the provider.
pub async fn google(State(state): State<AppState>, jar: CookieJar) -> Response {
    let ctx = state.auth_context(&jar).await;
    let authorize_url = ctx.sign_in_with_google();
    let jar = state.persist(jar, ctx.client());
    (jar, Redirect::temporary(&authorize_url)).into_response()
}

/// `POST /auth/logout`: revoke with the provider and clear the cookies.
/// The cookies are cleared even when the provider call fails.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let ctx = state.auth_context(&jar).await;
    if let Err(e) = ctx.sign_out().await {
        tracing::warn!(error = %e, "provider sign-out failed; clearing cookies anyway");
    }
    let jar = storage::store(jar, &StoredAuth::default(), state.config.cookie_secure);
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
