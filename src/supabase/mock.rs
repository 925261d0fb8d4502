//! In-memory `AuthApi` for tests: canned successes, injectable failures and
//! a log of every call made.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use super::api::AuthApi;
use super::types::{AuthError, OAuthProvider, Session, SignUpOutcome, SignUpRequest, User, VerifyType};

pub const TEST_EMAIL: &str = "ada@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SignUp { email: String, has_challenge: bool },
    SignInWithPassword { email: String },
    RefreshSession { refresh_token: String },
    VerifyOtp { email: String, token: String, kind: VerifyType },
    ExchangeCode { auth_code: String, code_verifier: String },
    GetUser { access_token: String },
    SignOut { access_token: String },
    Resend { email: String, kind: VerifyType },
}

#[derive(Default)]
pub struct MockAuthApi {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, AuthError>>,
    sign_up_issues_session: Mutex<bool>,
    verify_issues_session: Mutex<Option<bool>>,
    /// When set, `exchange_code` waits for a release before answering.
    exchange_gate: Mutex<Option<Arc<Notify>>>,
    exchanges_finished: Arc<Notify>,
    exchange_done: Mutex<bool>,
}

impl MockAuthApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation fail with `err` from now on.
    pub fn fail(&self, op: &'static str, err: AuthError) {
        self.failures.lock().insert(op, err);
    }

    pub fn sign_up_issues_session(&self, yes: bool) {
        *self.sign_up_issues_session.lock() = yes;
    }

    pub fn verify_issues_session(&self, yes: bool) {
        *self.verify_issues_session.lock() = Some(yes);
    }

    /// Hold `exchange_code` until the returned handle is notified.
    pub fn hold_exchange(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.exchange_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Wait until an `exchange_code` call has returned its answer.
    pub async fn exchange_finished(&self) {
        if *self.exchange_done.lock() {
            return;
        }
        self.exchanges_finished.notified().await;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn record(&self, op: &'static str, call: Call) -> Result<(), AuthError> {
        self.calls.lock().push(call);
        match self.failures.lock().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuthApi {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        self.record(
            "sign_up",
            Call::SignUp { email: request.email.clone(), has_challenge: request.code_challenge.is_some() },
        )?;
        let mut user = test_user();
        user.email = Some(request.email.clone());
        user.user_metadata = request.data.clone();
        if *self.sign_up_issues_session.lock() {
            let session = Session { user: user.clone(), ..test_session("signup") };
            return Ok(SignUpOutcome { user: Some(user), session: Some(session) });
        }
        Ok(SignUpOutcome { user: Some(user), session: None })
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, AuthError> {
        self.record("sign_in_with_password", Call::SignInWithPassword { email: email.to_owned() })?;
        Ok(test_session("password"))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.record("refresh_session", Call::RefreshSession { refresh_token: refresh_token.to_owned() })?;
        Ok(test_session("refreshed"))
    }

    async fn verify_otp(&self, email: &str, token: &str, kind: VerifyType) -> Result<Option<Session>, AuthError> {
        self.record(
            "verify_otp",
            Call::VerifyOtp { email: email.to_owned(), token: token.to_owned(), kind },
        )?;
        let issues = self.verify_issues_session.lock().unwrap_or(true);
        Ok(issues.then(|| test_session("otp")))
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        self.record(
            "exchange_code",
            Call::ExchangeCode { auth_code: auth_code.to_owned(), code_verifier: code_verifier.to_owned() },
        )?;
        let gate = self.exchange_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        *self.exchange_done.lock() = true;
        self.exchanges_finished.notify_one();
        Ok(test_session("pkce"))
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        self.record("get_user", Call::GetUser { access_token: access_token.to_owned() })?;
        Ok(test_user())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.record("sign_out", Call::SignOut { access_token: access_token.to_owned() })
    }

    async fn resend(&self, email: &str, kind: VerifyType, _redirect_to: Option<&str>) -> Result<(), AuthError> {
        self.record("resend", Call::Resend { email: email.to_owned(), kind })
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str, scopes: &str, code_challenge: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to)
            .append_pair("scopes", scopes)
            .append_pair("code_challenge", code_challenge)
            .finish();
        format!("https://provider.test/auth/v1/authorize?{query}")
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

#[must_use]
pub fn test_user() -> User {
    User {
        id: Uuid::from_u128(0x6f1c_1a52_3c1e_4a8f_9b4e_2f0d_2c1a_9e11),
        email: Some(TEST_EMAIL.to_owned()),
        email_confirmed_at: Some("2024-01-01T00:00:00Z".to_owned()),
        user_metadata: serde_json::json!({ "first_name": "Ada", "last_name": "Lovelace" }),
    }
}

/// A session valid for an hour whose tokens are tagged with `tag`.
#[must_use]
pub fn test_session(tag: &str) -> Session {
    let expires_at = super::now_unix() + 3600;
    Session {
        access_token: test_jwt(expires_at),
        refresh_token: format!("refresh-{tag}"),
        token_type: "bearer".to_owned(),
        expires_in: 3600,
        expires_at,
        user: test_user(),
    }
}

/// Unsigned JWT carrying only an `exp` claim.
#[must_use]
pub fn test_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": "test" }).to_string());
    format!("{header}.{payload}.signature")
}
