//! GoTrue REST client: the stateless half of the identity provider.
//!
//! DESIGN
//! ======
//! `AuthApi` is the seam between the session client and the network: one
//! method per provider endpoint, no session state. `GoTrueApi` is the real
//! implementation; tests swap in an in-memory mock. Error bodies are parsed
//! in `parse_error` so the provider's own message reaches the user.

use std::time::Duration;

use serde::Serialize;

use super::pkce;
use super::types::{AuthError, OAuthProvider, Session, SignUpOutcome, SignUpRequest, TokenResponse, User, VerifyType};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const CLIENT_INFO: &str = concat!("forma/", env!("CARGO_PKG_VERSION"));

/// One call per provider endpoint. Implementations hold no session state.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Verify an email one-time token. Some kinds confirm without issuing a
    /// session, hence the `Option`.
    async fn verify_otp(&self, email: &str, token: &str, kind: VerifyType) -> Result<Option<Session>, AuthError>;

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Session, AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn resend(&self, email: &str, kind: VerifyType, redirect_to: Option<&str>) -> Result<(), AuthError>;

    /// Authorization URL the browser is sent to for an OAuth sign-in.
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str, scopes: &str, code_challenge: &str) -> String;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueApi {
    http: reqwest::Client,
    /// `<project url>/auth/v1`
    base_url: String,
    anon_key: String,
}

impl GoTrueApi {
    /// Build a client for the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(project_url: &str, anon_key: &str, timeout_secs: u64) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Network(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.to_owned(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str, bearer: Option<&str>) -> reqwest::RequestBuilder {
        let bearer = bearer.unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
            .header("X-Client-Info", CLIENT_INFO)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_error(status, &text));
        }
        Ok(text)
    }

    async fn token_grant<B: Serialize + Sync>(&self, grant_type: &str, body: &B) -> Result<Session, AuthError> {
        let text = self
            .send(
                self.request(reqwest::Method::POST, "/token", None)
                    .query(&[("grant_type", grant_type)])
                    .json(body),
            )
            .await?;
        parse_session(&text)
    }
}

#[async_trait::async_trait]
impl AuthApi for GoTrueApi {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        let body = SignUpBody {
            email: &request.email,
            password: &request.password,
            data: &request.data,
            code_challenge: request.code_challenge.as_deref(),
            code_challenge_method: request.code_challenge.as_ref().map(|_| pkce::CHALLENGE_METHOD),
        };
        let mut builder = self.request(reqwest::Method::POST, "/signup", None).json(&body);
        if let Some(redirect_to) = &request.email_redirect_to {
            builder = builder.query(&[("redirect_to", redirect_to)]);
        }
        let text = self.send(builder).await?;
        parse_sign_up(&text)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.token_grant("password", &serde_json::json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", &serde_json::json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn verify_otp(&self, email: &str, token: &str, kind: VerifyType) -> Result<Option<Session>, AuthError> {
        let body = serde_json::json!({ "email": email, "token": token, "type": kind.as_str() });
        let text = self
            .send(self.request(reqwest::Method::POST, "/verify", None).json(&body))
            .await?;
        parse_optional_session(&text)
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        self.token_grant("pkce", &serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .await
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        let text = self
            .send(self.request(reqwest::Method::GET, "/user", Some(access_token)))
            .await?;
        serde_json::from_str(&text).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.send(
            self.request(reqwest::Method::POST, "/logout", Some(access_token))
                .query(&[("scope", "global")]),
        )
        .await?;
        Ok(())
    }

    async fn resend(&self, email: &str, kind: VerifyType, redirect_to: Option<&str>) -> Result<(), AuthError> {
        let body = serde_json::json!({ "type": kind.as_str(), "email": email });
        let mut builder = self.request(reqwest::Method::POST, "/resend", None).json(&body);
        if let Some(redirect_to) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect_to)]);
        }
        self.send(builder).await?;
        Ok(())
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str, scopes: &str, code_challenge: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to)
            .append_pair("scopes", scopes)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD)
            .finish();
        format!("{}/authorize?{query}", self.base_url)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_challenge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_challenge_method: Option<&'a str>,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_session(json: &str) -> Result<Session, AuthError> {
    let token: TokenResponse = serde_json::from_str(json).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    Ok(token.into_session(super::now_unix()))
}

fn parse_optional_session(json: &str) -> Result<Option<Session>, AuthError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    if value.get("access_token").is_none() {
        return Ok(None);
    }
    let token: TokenResponse = serde_json::from_value(value).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    Ok(Some(token.into_session(super::now_unix())))
}

/// Sign-up answers with a session when email confirmation is off, and with
/// the bare user otherwise.
fn parse_sign_up(json: &str) -> Result<SignUpOutcome, AuthError> {
    if let Some(session) = parse_optional_session(json)? {
        return Ok(SignUpOutcome { user: Some(session.user.clone()), session: Some(session) });
    }
    let user: User = serde_json::from_str(json).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    Ok(SignUpOutcome { user: Some(user), session: None })
}

/// Build an `AuthError` from a non-success response, reading whichever
/// message/code fields the provider version uses.
pub(crate) fn parse_error(status: u16, body: &str) -> AuthError {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or(serde_json::Value::Null);

    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
        .or_else(|| (!body.trim().is_empty() && value.is_null()).then(|| body.trim().to_owned()))
        .unwrap_or_else(|| format!("request failed with status {status}"));

    let code = ["error_code", "code"].iter().find_map(|key| match value.get(*key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });

    AuthError::Api { status, code, message }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
