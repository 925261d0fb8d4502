//! Application-side authentication: the per-request auth context and the
//! callback resolver that turns provider redirects into sessions.

pub mod callback;
pub mod context;

pub use context::{AuthContext, AuthState};
