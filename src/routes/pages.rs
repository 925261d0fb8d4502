//! Home and dashboard.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AuthState;
use crate::guard::login_location;
use crate::render::{self, Alert};
use crate::state::AppState;
use crate::supabase::{StoredAuth, storage};

/// `GET /`: signed-in email and sign-out, or Google sign-in. The user is
/// re-read from the provider rather than trusted from the cookie.
pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let ctx = state.auth_context(&jar).await;
    let user = match ctx.state() {
        AuthState::Authenticated => ctx.refresh_profile().await,
        _ => None,
    };
    let error = match ctx.state() {
        AuthState::Error(message) => Some(message),
        _ => None,
    };
    let alert = error.as_deref().map_or(Alert::None, Alert::Error);
    let jar = state.persist(jar, ctx.client());
    (jar, render::home(user.as_ref(), alert)).into_response()
}

/// `GET /dashboard`: needs a usable session. A cookie that no longer
/// yields one is cleared so the guard stops waving the request through.
pub async fn dashboard(State(state): State<AppState>, jar: CookieJar, uri: axum::http::Uri) -> Response {
    let ctx = state.auth_context(&jar).await;
    let Some(user) = ctx.current_user() else {
        tracing::debug!(path = %uri.path(), "session cookie without a usable session");
        let cleared = StoredAuth { session: None, code_verifier: ctx.client().stored().code_verifier };
        let jar = storage::store(jar, &cleared, state.config.cookie_secure);
        return (jar, Redirect::temporary(&login_location(uri.path()))).into_response();
    };
    let jar = state.persist(jar, ctx.client());
    (jar, render::dashboard(&user)).into_response()
}
