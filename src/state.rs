//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the immutable config, the provider API handle and the resend
//! cooldown map. Session state is never shared: every request builds its own
//! `SessionClient` from the request cookies and writes it back through
//! `persist` when it changed.

use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::CookieJar;

use crate::auth::AuthContext;
use crate::config::AppConfig;
use crate::cooldown::ResendCooldown;
use crate::supabase::{AuthApi, ClientOptions, SessionClient, storage};

/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn AuthApi>,
    pub resend_cooldown: ResendCooldown,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, api: Arc<dyn AuthApi>) -> Self {
        let resend_cooldown = ResendCooldown::new(Duration::from_secs(config.resend_cooldown_secs));
        Self { config: Arc::new(config), api, resend_cooldown }
    }

    /// Session client restored from the request cookies.
    #[must_use]
    pub fn session_client(&self, jar: &CookieJar) -> Arc<SessionClient> {
        let stored = storage::load(jar);
        Arc::new(SessionClient::with_storage(Arc::clone(&self.api), ClientOptions::default(), stored))
    }

    /// Initialized auth context for the request.
    pub async fn auth_context(&self, jar: &CookieJar) -> AuthContext {
        let ctx = AuthContext::new(self.session_client(jar), self.config.site_url.clone());
        ctx.init().await;
        ctx
    }

    /// Write the client's state back into the response cookies when it
    /// changed during the request.
    #[must_use]
    pub fn persist(&self, jar: CookieJar, client: &SessionClient) -> CookieJar {
        if !client.options().persist_session || !client.is_dirty() {
            return jar;
        }
        storage::store(jar, &client.stored(), self.config.cookie_secure)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::mock::{TEST_EMAIL, test_session};
    use crate::supabase::storage::{SESSION_COOKIE, encode_session};
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn session_client_restores_cookie_session() {
        let (state, _api) = test_helpers::test_app_state();
        let session = test_session("cookie");
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, encode_session(&session)));

        let client = state.session_client(&jar);
        assert_eq!(client.current_session(), Some(session));
        assert!(!client.is_dirty());
    }

    #[test]
    fn persist_skips_clean_client() {
        let (state, _api) = test_helpers::test_app_state();
        let client = state.session_client(&CookieJar::new());
        let jar = state.persist(CookieJar::new(), &client);
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[tokio::test]
    async fn persist_writes_new_session() {
        let (state, _api) = test_helpers::test_app_state();
        let client = state.session_client(&CookieJar::new());
        client.sign_in_with_password(TEST_EMAIL, "Password1").await.unwrap();

        let jar = state.persist(CookieJar::new(), &client);
        let restored = storage::load(&jar);
        assert_eq!(restored.session.unwrap().refresh_token, "refresh-password");
    }

    #[tokio::test]
    async fn auth_context_is_initialized() {
        let (state, _api) = test_helpers::test_app_state();
        let ctx = state.auth_context(&CookieJar::new()).await;
        assert!(!ctx.is_loading());
    }
}
