//! Cookie persistence for the session and the PKCE code verifier.
//!
//! The session cookie value is `base64-` followed by the base64url JSON of
//! the session, so it survives cookie character restrictions. The route
//! guard only looks at whether this cookie is present.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use time::Duration;

use super::types::Session;

pub const SESSION_COOKIE: &str = "sb-forma-auth-session";
pub const CODE_VERIFIER_COOKIE: &str = "sb-forma-auth-session-code-verifier";

const ENCODED_PREFIX: &str = "base64-";
const COOKIE_MAX_AGE_DAYS: i64 = 400;

/// What the session client persists between requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredAuth {
    pub session: Option<Session>,
    pub code_verifier: Option<String>,
}

#[must_use]
pub fn encode_session(session: &Session) -> String {
    // Session contains only strings, integers and a JSON value.
    let json = serde_json::to_vec(session).unwrap_or_default();
    format!("{ENCODED_PREFIX}{}", URL_SAFE_NO_PAD.encode(json))
}

/// Decode a session cookie value. Malformed values read as no session.
#[must_use]
pub fn decode_session(value: &str) -> Option<Session> {
    let encoded = value.strip_prefix(ENCODED_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Read persisted auth state from request cookies.
#[must_use]
pub fn load(jar: &CookieJar) -> StoredAuth {
    let session = jar.get(SESSION_COOKIE).and_then(|c| {
        let decoded = decode_session(c.value());
        if decoded.is_none() && !c.value().is_empty() {
            tracing::debug!("ignoring undecodable session cookie");
        }
        decoded
    });
    let code_verifier = jar
        .get(CODE_VERIFIER_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty());
    StoredAuth { session, code_verifier }
}

/// Write persisted auth state into the response jar, removing cookies for
/// absent values.
#[must_use]
pub fn store(jar: CookieJar, stored: &StoredAuth, secure: bool) -> CookieJar {
    let jar = match &stored.session {
        Some(session) => jar.add(build_cookie(SESSION_COOKIE, encode_session(session), secure)),
        None => jar.add(expired_cookie(SESSION_COOKIE, secure)),
    };
    match &stored.code_verifier {
        Some(verifier) => jar.add(build_cookie(CODE_VERIFIER_COOKIE, verifier.clone(), secure)),
        None => jar.add(expired_cookie(CODE_VERIFIER_COOKIE, secure)),
    }
}

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(COOKIE_MAX_AGE_DAYS))
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
