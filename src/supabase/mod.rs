//! Identity provider integration (Supabase Auth / GoTrue).
//!
//! ARCHITECTURE
//! ============
//! `api` talks to the provider's REST endpoints and holds no state.
//! `client` layers the session on top: persistence through `storage`,
//! refresh-before-expiry, PKCE verifier bookkeeping and change
//! notifications. Everything above this module goes through
//! [`SessionClient`].

pub mod api;
pub mod client;
#[cfg(test)]
pub mod mock;
pub mod pkce;
pub mod storage;
pub mod types;

pub use api::{AuthApi, GoTrueApi};
pub use client::{ClientOptions, SessionClient, Subscription};
pub use storage::StoredAuth;
pub use types::{AuthError, OAuthProvider, Session, SignUpOutcome, SignUpRequest, User, VerifyType};

/// Current time as unix seconds.
#[must_use]
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
