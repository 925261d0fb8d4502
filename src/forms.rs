//! Sign-up and login form validation.
//!
//! Errors are keyed by form field name. A field keeps only its last failing
//! rule's message. A form that fails validation never reaches the provider.

use std::collections::BTreeMap;

use serde::Deserialize;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 8;

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn set(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl SignUpForm {
    /// # Errors
    ///
    /// Returns every failing field. The confirmation is compared only once
    /// all other fields pass.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);
        if !is_valid_email(&self.email) {
            errors.set("email", "Enter a valid email address");
        }
        if self.password.chars().count() < PASSWORD_MIN {
            errors.set("password", "Password must be at least 8 characters");
        }
        if !has_mixed_case_and_digit(&self.password) {
            errors.set("password", "Use mixed case and numbers");
        }
        if errors.is_empty() && self.password != self.confirm_password {
            errors.set("confirm_password", "Passwords do not match");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Local path to return to after sign-in.
    #[serde(default)]
    pub redirect: Option<String>,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if !is_valid_email(&self.email) {
            errors.set("email", "Enter a valid email address");
        }
        if self.password.is_empty() {
            errors.set("password", "Password is required");
        }
        errors.into_result()
    }
}

// =============================================================================
// RULES
// =============================================================================

fn check_name(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str) {
    let len = value.chars().count();
    if len < NAME_MIN {
        errors.set(field, format!("{label} must be at least {NAME_MIN} characters"));
    } else if len > NAME_MAX {
        errors.set(field, format!("{label} must be at most {NAME_MAX} characters"));
    }
}

/// One `@`, a non-empty local part and a dotted domain, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let parts = email.split('@').collect::<Vec<_>>();
    let [local, domain] = parts.as_slice() else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn has_mixed_case_and_digit(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Accept only same-site absolute paths as post-login targets. Browsers
/// drop tabs and newlines while parsing a `Location`, so any control or
/// whitespace character is refused along with `//` and `\`.
#[must_use]
pub fn safe_redirect(target: Option<&str>) -> Option<&str> {
    target.filter(|t| {
        t.starts_with('/')
            && !t.starts_with("//")
            && !t.contains('\\')
            && !t.chars().any(|c| c.is_control() || c.is_whitespace())
    })
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
