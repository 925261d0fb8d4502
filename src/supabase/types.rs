//! Provider types: sessions, users, verification kinds and errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity-provider calls.
///
/// `Display` is the provider's message verbatim so it can be shown to users
/// without further translation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, code: Option<String>, message: String },

    /// The request never produced a response.
    #[error("{0}")]
    Network(String),

    /// The provider response body could not be understood.
    #[error("{0}")]
    InvalidResponse(String),

    /// An operation needed a session and there was none.
    #[error("Auth session missing!")]
    SessionMissing,

    /// A code exchange was attempted without a stored PKCE verifier.
    #[error("PKCE code verifier not found in storage. This can happen if the auth flow was initiated in a different browser or device.")]
    PkceVerifierMissing,

    /// An access token could not be decoded.
    #[error("Invalid JWT structure")]
    InvalidJwt,
}

impl AuthError {
    /// HTTP status of an API error, if the provider returned one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// USER & SESSION
// =============================================================================

/// Identity record derived from a session. Read-only for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    /// Free-form metadata supplied at sign-up (`first_name`, `last_name`).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Metadata string field, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Provider-issued credential pair plus expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Absolute expiry as unix seconds.
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    /// Whether the session expires within `margin_secs` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at <= now + margin_secs
    }
}

/// Token endpoint response body. `expires_at` is optional on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl TokenResponse {
    pub(crate) fn into_session(self, now: i64) -> Session {
        Session {
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            user: self.user,
        }
    }
}

/// Result of a sign-up: a session when the project auto-confirms emails,
/// otherwise only the pending user.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Sign-up request as sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Stored as the user's metadata.
    pub data: serde_json::Value,
    pub email_redirect_to: Option<String>,
    /// S256 PKCE challenge; filled in by the session client.
    pub code_challenge: Option<String>,
}

// =============================================================================
// VERIFY TYPE
// =============================================================================

/// Kind of email one-time token carried by a verification link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyType {
    Signup,
    Invite,
    Magiclink,
    Recovery,
    EmailChange,
}

impl VerifyType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Invite => "invite",
            Self::Magiclink => "magiclink",
            Self::Recovery => "recovery",
            Self::EmailChange => "email_change",
        }
    }
}

impl fmt::Display for VerifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerifyType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "signup" => Ok(Self::Signup),
            "invite" => Ok(Self::Invite),
            "magiclink" => Ok(Self::Magiclink),
            "recovery" => Ok(Self::Recovery),
            "email_change" => Ok(Self::EmailChange),
            other => Err(format!("Unsupported verification type: {other}")),
        }
    }
}

// =============================================================================
// OAUTH & EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

/// Session-change notification delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
