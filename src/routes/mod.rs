//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Server-rendered pages over the identity provider. The route guard runs
//! in front of every route; handlers build a per-request auth context from
//! the cookies and write the session cookie back when it changed.

pub mod auth;
pub mod callback;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::guard::route_guard;
use crate::state::AppState;
use crate::supabase::AuthError;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/{*rest}", get(pages::dashboard))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/signup", get(auth::signup_page).post(auth::signup))
        .route("/auth/verify", get(auth::verify_page))
        .route("/auth/verify/resend", post(auth::resend_verification))
        .route("/auth/google", get(auth::google))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/callback", get(callback::shell).post(callback::complete))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Status for a page re-rendered after a provider error. Client errors pass
/// through; anything else reads as a bad gateway.
pub(crate) fn provider_error_status(err: &AuthError) -> StatusCode {
    err.status()
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(StatusCode::is_client_error)
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use axum::response::Response;

    use crate::supabase::Session;
    use crate::supabase::storage::{CODE_VERIFIER_COOKIE, SESSION_COOKIE, encode_session};

    pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::empty()).unwrap()
    }

    pub fn post_form(path: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::from(body.to_owned())).unwrap()
    }

    pub fn session_cookie(session: &Session) -> String {
        format!("{SESSION_COOKIE}={}", encode_session(session))
    }

    pub fn verifier_cookie(verifier: &str) -> String {
        format!("{CODE_VERIFIER_COOKIE}={verifier}")
    }

    pub async fn body_text(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `Set-Cookie` header for `name`, if the response sets it.
    pub fn set_cookie<'a>(res: &'a Response, name: &str) -> Option<&'a str> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{name}=")))
    }

    pub fn location(res: &Response) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    /// Form-encode key/value pairs.
    pub fn form(pairs: &[(&str, &str)]) -> String {
        url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
