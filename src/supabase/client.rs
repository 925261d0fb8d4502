//! Session client: the provider API plus session state.
//!
//! DESIGN
//! ======
//! One `SessionClient` per request, restored from cookie storage and written
//! back by the route layer when `is_dirty()` reports a change. Listeners are
//! invoked synchronously after each state change, outside the state lock, so
//! a listener may read the client again without deadlocking.
//!
//! TRADE-OFFS
//! ==========
//! Refresh happens lazily on `get_session` rather than on a background timer:
//! a request-scoped client never lives long enough for a timer to fire.

use std::sync::{Arc, Weak};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;

use super::api::AuthApi;
use super::storage::StoredAuth;
use super::types::{AuthChangeEvent, AuthError, OAuthProvider, Session, SignUpOutcome, SignUpRequest, User, VerifyType};
use super::{now_unix, pkce};

/// Sessions expiring within this many seconds are refreshed on read.
pub const EXPIRY_MARGIN_SECS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Restore from and write back to cookie storage.
    pub persist_session: bool,
    /// Refresh an expiring session when it is read.
    pub auto_refresh_token: bool,
    /// Accept session tokens delivered in the callback URL fragment.
    pub detect_session_in_url: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { persist_session: true, auto_refresh_token: true, detect_session_in_url: true }
    }
}

type Listener = Arc<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Default)]
struct ClientState {
    session: Option<Session>,
    code_verifier: Option<String>,
    /// Set whenever storage-relevant state changes.
    dirty: bool,
}

pub struct SessionClient {
    api: Arc<dyn AuthApi>,
    options: ClientOptions,
    state: Mutex<ClientState>,
    listeners: Arc<Mutex<Listeners>>,
}

/// Handle for a change listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl SessionClient {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, options: ClientOptions) -> Self {
        Self { api, options, state: Mutex::new(ClientState::default()), listeners: Arc::default() }
    }

    /// Build a client seeded from storage. Restoring does not notify
    /// listeners and does not mark the client dirty.
    #[must_use]
    pub fn with_storage(api: Arc<dyn AuthApi>, options: ClientOptions, stored: StoredAuth) -> Self {
        let client = Self::new(api, options);
        if options.persist_session {
            let mut state = client.state.lock();
            state.session = stored.session;
            state.code_verifier = stored.code_verifier;
        }
        client
    }

    #[must_use]
    pub fn options(&self) -> ClientOptions {
        self.options
    }

    /// Snapshot of what storage should hold.
    #[must_use]
    pub fn stored(&self) -> StoredAuth {
        let state = self.state.lock();
        StoredAuth { session: state.session.clone(), code_verifier: state.code_verifier.clone() }
    }

    /// Whether storage needs rewriting since restore.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// The stored session as-is, without refreshing.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Register a listener for session changes.
    pub fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(AuthChangeEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription { id, listeners: Arc::downgrade(&self.listeners) }
    }

    fn notify(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event, session);
        }
    }

    fn save_session(&self, session: &Session, event: AuthChangeEvent) {
        {
            let mut state = self.state.lock();
            state.session = Some(session.clone());
            state.dirty = true;
        }
        self.notify(event, Some(session));
    }

    fn remove_session(&self) {
        {
            let mut state = self.state.lock();
            state.session = None;
            state.dirty = true;
        }
        self.notify(AuthChangeEvent::SignedOut, None);
    }

    fn store_code_verifier(&self, verifier: String) {
        let mut state = self.state.lock();
        state.code_verifier = Some(verifier);
        state.dirty = true;
    }

    fn take_code_verifier(&self) -> Option<String> {
        let mut state = self.state.lock();
        let verifier = state.code_verifier.take();
        if verifier.is_some() {
            state.dirty = true;
        }
        verifier
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Current session, refreshed first when it is about to expire.
    ///
    /// # Errors
    ///
    /// Returns the provider error when a needed refresh fails. A rejected
    /// refresh token also removes the session.
    pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.get_session_at(now_unix()).await
    }

    pub(crate) async fn get_session_at(&self, now: i64) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !self.options.auto_refresh_token || !session.expires_within(now, EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        match self.api.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                tracing::debug!(user_id = %fresh.user.id, "session refreshed");
                self.save_session(&fresh, AuthChangeEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                if matches!(e, AuthError::Api { .. }) {
                    self.remove_session();
                }
                Err(e)
            }
        }
    }

    /// Establish a session from a token pair delivered out of band.
    ///
    /// # Errors
    ///
    /// Returns `InvalidJwt` for an undecodable access token, or the provider
    /// error from the user lookup / refresh.
    pub async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<Session, AuthError> {
        let now = now_unix();
        let expires_at = jwt_expiry(access_token).ok_or(AuthError::InvalidJwt)?;

        let session = if expires_at <= now {
            self.api.refresh_session(refresh_token).await?
        } else {
            let user = self.api.get_user(access_token).await?;
            Session {
                access_token: access_token.to_owned(),
                refresh_token: refresh_token.to_owned(),
                token_type: "bearer".to_owned(),
                expires_in: expires_at - now,
                expires_at,
                user,
            }
        };

        self.save_session(&session, AuthChangeEvent::SignedIn);
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns the provider error when verification fails.
    pub async fn verify_otp(&self, email: &str, token: &str, kind: VerifyType) -> Result<Option<Session>, AuthError> {
        let session = self.api.verify_otp(email, token, kind).await?;
        if let Some(session) = &session {
            let event = if kind == VerifyType::Recovery {
                AuthChangeEvent::PasswordRecovery
            } else {
                AuthChangeEvent::SignedIn
            };
            self.save_session(session, event);
        }
        Ok(session)
    }

    /// Exchange an authorization code using the stored PKCE verifier. The
    /// verifier is consumed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `PkceVerifierMissing` without calling the provider when no
    /// verifier is stored, else the provider error.
    pub async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, AuthError> {
        let verifier = self.take_code_verifier().ok_or(AuthError::PkceVerifierMissing)?;
        let session = self.api.exchange_code(auth_code, &verifier).await?;
        self.save_session(&session, AuthChangeEvent::SignedIn);
        Ok(session)
    }

    // =========================================================================
    // SIGN-IN FLOWS
    // =========================================================================

    /// Register a new account. The confirmation link comes back as a PKCE
    /// code, so a verifier is stored first.
    ///
    /// # Errors
    ///
    /// Returns the provider error.
    pub async fn sign_up(&self, mut request: SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        let verifier = pkce::generate_verifier();
        request.code_challenge = Some(pkce::challenge(&verifier));
        self.store_code_verifier(verifier);

        let outcome = self.api.sign_up(&request).await?;
        if let Some(session) = &outcome.session {
            self.save_session(session, AuthChangeEvent::SignedIn);
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns the provider error.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.api.sign_in_with_password(email, password).await?;
        self.save_session(&session, AuthChangeEvent::SignedIn);
        Ok(session)
    }

    /// Start an OAuth sign-in and return the URL to send the browser to.
    #[must_use]
    pub fn sign_in_with_oauth(&self, provider: OAuthProvider, redirect_to: &str, scopes: &str) -> String {
        let verifier = pkce::generate_verifier();
        let challenge = pkce::challenge(&verifier);
        self.store_code_verifier(verifier);
        self.api.authorize_url(provider, redirect_to, scopes, &challenge)
    }

    /// Revoke the session with the provider and forget it locally.
    ///
    /// # Errors
    ///
    /// Returns the provider error unless it says the session is already gone
    /// (401/403/404), in which case the local session is still removed.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current_session() {
            if let Err(e) = self.api.sign_out(&session.access_token).await {
                if !matches!(e.status(), Some(401 | 403 | 404)) {
                    return Err(e);
                }
                tracing::debug!(error = %e, "provider session already gone");
            }
        }
        self.remove_session();
        Ok(())
    }

    /// Fetch the user for the current session from the provider.
    ///
    /// # Errors
    ///
    /// Returns `SessionMissing` when there is no session, else the provider
    /// error.
    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().await?.ok_or(AuthError::SessionMissing)?;
        let user = self.api.get_user(&session.access_token).await?;

        if user != session.user {
            let updated = Session { user: user.clone(), ..session };
            self.save_session(&updated, AuthChangeEvent::UserUpdated);
        }
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns the provider error.
    pub async fn resend(&self, email: &str, kind: VerifyType, redirect_to: Option<&str>) -> Result<(), AuthError> {
        self.api.resend(email, kind, redirect_to).await
    }
}

/// `exp` claim of a JWT, without verifying the signature.
pub(crate) fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp").and_then(serde_json::Value::as_i64)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
