//! In-memory cooldown for verification-email resends.
//!
//! DESIGN
//! ======
//! One deadline per normalized email in a `HashMap<String, Instant>`.
//! Signing up or resending starts the window; a resend inside it is
//! refused with the time remaining. Expired entries are pruned on access.
//!
//! TRADE-OFFS
//! ==========
//! State is process-local, so a restart resets every countdown. The provider
//! enforces its own resend limit behind this one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resend available in {remaining_secs}s")]
pub struct CooldownError {
    pub remaining_secs: u64,
}

#[derive(Clone)]
pub struct ResendCooldown {
    inner: Arc<Mutex<HashMap<String, Instant>>>,
    window: Duration,
}

impl ResendCooldown {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start (or restart) the window for `email`.
    pub fn start(&self, email: &str) {
        self.start_at(email, Instant::now());
    }

    /// Time left before `email` may resend. Zero when allowed.
    #[must_use]
    pub fn remaining(&self, email: &str) -> Duration {
        self.remaining_at(email, Instant::now())
    }

    /// Refuse while the window is open. Callers restart the window with
    /// [`ResendCooldown::start`] once the resend went out.
    ///
    /// # Errors
    ///
    /// Returns the remaining wait when called too early.
    pub fn check(&self, email: &str) -> Result<(), CooldownError> {
        self.check_at(email, Instant::now())
    }

    fn start_at(&self, email: &str, now: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.retain(|_, deadline| *deadline > now);
        inner.insert(normalize(email), now + self.window);
    }

    fn remaining_at(&self, email: &str, now: Instant) -> Duration {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .get(&normalize(email))
            .map_or(Duration::ZERO, |deadline| deadline.saturating_duration_since(now))
    }

    fn check_at(&self, email: &str, now: Instant) -> Result<(), CooldownError> {
        let remaining = self.remaining_at(email, now);
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(CooldownError { remaining_secs: ceil_secs(remaining) })
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Whole seconds, rounding a partial second up so "00:00" means allowed.
#[must_use]
pub fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// `mm:ss`, minutes unbounded.
#[must_use]
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
#[path = "cooldown_test.rs"]
mod tests;
