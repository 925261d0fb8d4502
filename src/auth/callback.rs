//! Callback resolver: turns whatever the provider redirected back with into
//! a session, or into one named failure.
//!
//! ARCHITECTURE
//! ============
//! An already-active session wins outright. Otherwise the URL is matched
//! against `BRANCHES`, an ordered predicate table; the first match runs and
//! its outcome is final. At most one provider call is made per branch and
//! nothing is retried.
//!
//! Cancellation is advisory: the flag is read after each awaited provider
//! call and a cancelled run yields `None`, but an in-flight request is
//! allowed to finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use url::Url;

use crate::supabase::{AuthError, Session, SessionClient, VerifyType};

/// Pause between showing success and navigating to the dashboard.
pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Where a successful resolution sends the browser.
pub const SUCCESS_REDIRECT: &str = "/dashboard";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Provider message, verbatim.
    #[error("{0}")]
    Provider(String),

    #[error("Unable to establish a session.")]
    SessionNotEstablished,

    #[error("Missing email for verification.")]
    MissingEmail,

    #[error("Unable to verify email.")]
    VerificationFailed,

    #[error("Unsupported verification type: {0}")]
    UnsupportedType(String),

    #[error("Unable to complete sign-in.")]
    SignInIncomplete,

    /// `error_description` from the redirect, verbatim.
    #[error("{0}")]
    Redirect(String),

    #[error("No active session. Please try signing in again.")]
    NoSession,
}

impl ResolveError {
    /// The provider's message when it has one, else `fallback`.
    fn from_provider(err: &AuthError, fallback: Self) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() { fallback } else { Self::Provider(message) }
    }
}

pub type Resolution = Result<Session, ResolveError>;

// =============================================================================
// PARAMS
// =============================================================================

/// Credentials a provider redirect may carry. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub kind: Option<String>,
    pub code: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read fragment tokens and query parameters from a full callback URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let fragment: Vec<(String, String)> = url
            .fragment()
            .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            access_token: lookup(&fragment, "access_token"),
            refresh_token: lookup(&fragment, "refresh_token"),
            token: lookup(&query, "token"),
            email: lookup(&query, "email"),
            kind: lookup(&query, "type"),
            code: lookup(&query, "code"),
            error_description: lookup(&query, "error_description"),
        }
    }
}

fn lookup(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).filter(|v| !v.is_empty())
}

// =============================================================================
// BRANCHES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackBranch {
    FragmentTokens,
    EmailOtp,
    CodeExchange,
    ProviderError,
    NoSession,
}

type Predicate = fn(&CallbackParams) -> bool;

fn has_fragment_tokens(p: &CallbackParams) -> bool {
    p.access_token.is_some() && p.refresh_token.is_some()
}

fn has_otp(p: &CallbackParams) -> bool {
    p.token.is_some() && p.kind.is_some()
}

fn has_code(p: &CallbackParams) -> bool {
    p.code.is_some()
}

fn has_error_description(p: &CallbackParams) -> bool {
    p.error_description.is_some()
}

/// Evaluated in order; the first match wins.
const BRANCHES: [(CallbackBranch, Predicate); 4] = [
    (CallbackBranch::FragmentTokens, has_fragment_tokens),
    (CallbackBranch::EmailOtp, has_otp),
    (CallbackBranch::CodeExchange, has_code),
    (CallbackBranch::ProviderError, has_error_description),
];

/// Pick the branch for `params`. Fragment tokens are ignored when the client
/// does not detect sessions in the URL.
#[must_use]
pub fn select_branch(params: &CallbackParams, detect_session_in_url: bool) -> CallbackBranch {
    BRANCHES
        .iter()
        .filter(|(branch, _)| detect_session_in_url || *branch != CallbackBranch::FragmentTokens)
        .find(|(_, matches)| matches(params))
        .map_or(CallbackBranch::NoSession, |(branch, _)| *branch)
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Shared cancellation flag for one resolution.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Guard that cancels the flag when dropped.
    #[must_use]
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

// =============================================================================
// RESOLVE
// =============================================================================

/// Resolve a callback URL against `client`. On success the URL's query and
/// fragment are stripped. Returns `None` when cancelled after a provider
/// call, in which case `url` is untouched.
pub async fn resolve(client: &SessionClient, url: &mut Url, cancel: &CancelFlag) -> Option<Resolution> {
    let existing = client.get_session().await;
    if cancel.is_cancelled() {
        return None;
    }

    let outcome = match existing {
        Err(e) => Err(ResolveError::Provider(e.to_string())),
        Ok(Some(session)) => Ok(session),
        Ok(None) => {
            let params = CallbackParams::from_url(url);
            let branch = select_branch(&params, client.options().detect_session_in_url);
            tracing::debug!(?branch, "resolving auth callback");
            run_branch(client, branch, &params, cancel).await?
        }
    };

    if outcome.is_ok() {
        url.set_query(None);
        url.set_fragment(None);
    }
    Some(outcome)
}

async fn run_branch(
    client: &SessionClient,
    branch: CallbackBranch,
    params: &CallbackParams,
    cancel: &CancelFlag,
) -> Option<Resolution> {
    match branch {
        CallbackBranch::FragmentTokens => {
            let (Some(access), Some(refresh)) = (&params.access_token, &params.refresh_token) else {
                return Some(Err(ResolveError::SessionNotEstablished));
            };
            let result = client.set_session(access, refresh).await;
            if cancel.is_cancelled() {
                return None;
            }
            Some(result.map_err(|e| ResolveError::from_provider(&e, ResolveError::SessionNotEstablished)))
        }
        CallbackBranch::EmailOtp => {
            let (Some(token), Some(kind)) = (&params.token, &params.kind) else {
                return Some(Err(ResolveError::VerificationFailed));
            };
            let Some(email) = &params.email else {
                return Some(Err(ResolveError::MissingEmail));
            };
            let Ok(kind) = kind.parse::<VerifyType>() else {
                return Some(Err(ResolveError::UnsupportedType(kind.clone())));
            };
            let result = client.verify_otp(email, token, kind).await;
            if cancel.is_cancelled() {
                return None;
            }
            Some(match result {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(ResolveError::VerificationFailed),
                Err(e) => Err(ResolveError::from_provider(&e, ResolveError::VerificationFailed)),
            })
        }
        CallbackBranch::CodeExchange => {
            let Some(code) = &params.code else {
                return Some(Err(ResolveError::SignInIncomplete));
            };
            let result = client.exchange_code_for_session(code).await;
            if cancel.is_cancelled() {
                return None;
            }
            Some(result.map_err(|e| ResolveError::from_provider(&e, ResolveError::SignInIncomplete)))
        }
        CallbackBranch::ProviderError => {
            Some(Err(ResolveError::Redirect(params.error_description.clone().unwrap_or_default())))
        }
        CallbackBranch::NoSession => Some(Err(ResolveError::NoSession)),
    }
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
