//! Route guard: cookie-presence redirects, run before every handler.
//!
//! The guard never validates the session; a stale cookie still counts as
//! signed in and the page handler deals with it.

use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::supabase::storage::SESSION_COOKIE;

const AUTH_PAGE_PREFIXES: [&str; 4] = ["/auth/login", "/auth/signup", "/auth/verify", "/auth/callback"];

pub const LOGIN_PATH: &str = "/auth/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Sign-in screens a signed-in user has no business on.
    AuthPage,
    /// Pages that need a session.
    Protected,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    /// Carries the full `Location`, including the `redirect` query.
    RedirectToLogin(String),
    RedirectToDashboard,
}

#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if AUTH_PAGE_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        RouteClass::AuthPage
    } else if path == "/" || path.starts_with(DASHBOARD_PATH) {
        RouteClass::Protected
    } else {
        RouteClass::Other
    }
}

#[must_use]
pub fn decide(path: &str, has_session: bool) -> GuardDecision {
    match (classify(path), has_session) {
        (RouteClass::Protected, false) => GuardDecision::RedirectToLogin(login_location(path)),
        (RouteClass::AuthPage, true) => GuardDecision::RedirectToDashboard,
        _ => GuardDecision::Pass,
    }
}

/// Login URL that returns the user to `path` afterwards.
#[must_use]
pub fn login_location(path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", path)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Whether the request carries a non-empty session cookie.
#[must_use]
pub fn has_session_cookie(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE).is_some_and(|c| !c.value().is_empty())
}

/// Redirect that lands as a `GET`: `307` keeps a `GET`/`HEAD`, anything
/// else gets `303` since the targets only serve `GET`.
fn redirect_for(method: &Method, location: &str) -> Redirect {
    if method == Method::GET || method == Method::HEAD {
        Redirect::temporary(location)
    } else {
        Redirect::to(location)
    }
}

/// Axum middleware applying [`decide`] to every request.
pub async fn route_guard(jar: CookieJar, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    match decide(&path, has_session_cookie(&jar)) {
        GuardDecision::Pass => next.run(req).await,
        GuardDecision::RedirectToLogin(location) => {
            tracing::debug!(%path, method = %req.method(), "no session cookie, redirecting to login");
            redirect_for(req.method(), &location).into_response()
        }
        GuardDecision::RedirectToDashboard => {
            tracing::debug!(%path, method = %req.method(), "already signed in, redirecting to dashboard");
            redirect_for(req.method(), DASHBOARD_PATH).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
