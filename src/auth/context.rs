//! Auth context: current user/session plus the delegate auth operations.
//!
//! DESIGN
//! ======
//! One context per request, built around that request's `SessionClient`.
//! The context subscribes to session-change notifications on construction
//! and mirrors them into its snapshot; the subscription lives until
//! `teardown` or drop. Every delegate is a single client call: a provider
//! error lands in the error slot and is returned to the caller unchanged.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::supabase::{AuthError, OAuthProvider, Session, SessionClient, SignUpOutcome, SignUpRequest, Subscription, User};

/// Scopes requested from Google.
pub const GOOGLE_SCOPES: &str = "email profile openid";

/// Coarse auth status derived from the context snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Loading,
    Authenticated,
    Error(String),
}

#[derive(Debug)]
struct Snapshot {
    user: Option<User>,
    session: Option<Session>,
    loading: bool,
    error: Option<AuthError>,
}

pub struct AuthContext {
    client: Arc<SessionClient>,
    site_url: String,
    snapshot: Arc<Mutex<Snapshot>>,
    subscription: Mutex<Option<Subscription>>,
}

impl AuthContext {
    /// Build a context and subscribe it to `client`'s session changes. The
    /// context starts out loading until [`AuthContext::init`] runs.
    #[must_use]
    pub fn new(client: Arc<SessionClient>, site_url: impl Into<String>) -> Self {
        let snapshot = Arc::new(Mutex::new(Snapshot { user: None, session: None, loading: true, error: None }));

        let mirror = Arc::clone(&snapshot);
        let subscription = client.on_auth_state_change(move |_event, session| {
            let mut snap = mirror.lock();
            snap.session = session.cloned();
            snap.user = session.map(|s| s.user.clone());
        });

        Self {
            client,
            site_url: site_url.into().trim_end_matches('/').to_owned(),
            snapshot,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Load the current session. A failure is recorded, not returned.
    pub async fn init(&self) {
        let result = self.client.get_session().await;
        let mut snap = self.snapshot.lock();
        match result {
            Ok(session) => {
                snap.user = session.as_ref().map(|s| s.user.clone());
                snap.session = session;
            }
            Err(e) => {
                tracing::debug!(error = %e, "initial session load failed");
                snap.session = self.client.current_session();
                snap.user = snap.session.as_ref().map(|s| s.user.clone());
                snap.error = Some(e);
            }
        }
        snap.loading = false;
    }

    /// Release the session-change subscription. Idempotent.
    pub fn teardown(&self) {
        self.subscription.lock().take();
    }

    // =========================================================================
    // READ SIDE
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> AuthState {
        let snap = self.snapshot.lock();
        if snap.loading {
            AuthState::Loading
        } else if snap.session.is_some() {
            AuthState::Authenticated
        } else if let Some(e) = &snap.error {
            AuthState::Error(e.to_string())
        } else {
            AuthState::Unauthenticated
        }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.snapshot.lock().user.clone()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.snapshot.lock().session.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.snapshot.lock().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<AuthError> {
        self.snapshot.lock().error.clone()
    }

    #[must_use]
    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    // =========================================================================
    // DELEGATES
    // =========================================================================

    /// Register an account. The confirmation link returns to the callback
    /// route with the email in the query.
    ///
    /// # Errors
    ///
    /// Returns the provider error, also recorded in the error slot.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        self.clear_error();
        let encoded_email: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
        let request = SignUpRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            data: serde_json::json!({ "first_name": first_name, "last_name": last_name }),
            email_redirect_to: Some(format!("{}/auth/callback?email={encoded_email}", self.site_url)),
            code_challenge: None,
        };
        self.record(self.client.sign_up(request).await)
    }

    /// # Errors
    ///
    /// Returns the provider error, also recorded in the error slot.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.clear_error();
        self.record(self.client.sign_in_with_password(email, password).await)
    }

    /// # Errors
    ///
    /// Returns the provider error, also recorded in the error slot. The
    /// snapshot keeps its session in that case.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.clear_error();
        self.record(self.client.sign_out().await)?;
        let mut snap = self.snapshot.lock();
        snap.session = None;
        snap.user = None;
        Ok(())
    }

    /// Start Google sign-in. Returns the provider URL to redirect to.
    #[must_use]
    pub fn sign_in_with_google(&self) -> String {
        self.clear_error();
        let redirect_to = format!("{}/auth/callback", self.site_url);
        self.client.sign_in_with_oauth(OAuthProvider::Google, &redirect_to, GOOGLE_SCOPES)
    }

    /// Re-read the user from the provider. When that fails the snapshot
    /// drops both user and session, so the context never reads as
    /// authenticated without a user. The client's stored session and the
    /// error slot are left alone.
    pub async fn refresh_profile(&self) -> Option<User> {
        let user = match self.client.get_user().await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "profile refresh failed");
                None
            }
        };
        let mut snap = self.snapshot.lock();
        snap.user.clone_from(&user);
        if user.is_none() {
            snap.session = None;
        }
        user
    }

    fn clear_error(&self) {
        self.snapshot.lock().error = None;
    }

    fn record<T>(&self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        if let Err(e) = &result {
            self.snapshot.lock().error = Some(e.clone());
        }
        result
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
