//! Application configuration parsed from environment variables.
//!
//! The two provider values are required; everything else has a default.
//! `main` treats any error here as fatal.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESEND_COOLDOWN_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Provider project URL, without trailing slash.
    pub supabase_url: String,
    /// Public (anon) API key sent with every provider request.
    pub supabase_anon_key: String,
    pub port: u16,
    /// Public origin of this site, used to build redirect URLs.
    pub site_url: String,
    pub cookie_secure: bool,
    pub request_timeout_secs: u64,
    pub resend_cooldown_secs: u64,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `SITE_URL`: default `http://localhost:<PORT>`
    /// - `COOKIE_SECURE`: inferred from the `SITE_URL` scheme when absent
    /// - `SUPABASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RESEND_COOLDOWN_SECS`: default 300
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is missing or empty, or if a
    /// present value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_owned();
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let site_url = std::env::var("SITE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();
        if url::Url::parse(&site_url).is_err() {
            return Err(ConfigError::Invalid { var: "SITE_URL", value: site_url });
        }

        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| site_url.starts_with("https://"));

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            port,
            site_url,
            cookie_secure,
            request_timeout_secs: env_parse_u64("SUPABASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            resend_cooldown_secs: env_parse_u64("RESEND_COOLDOWN_SECS", DEFAULT_RESEND_COOLDOWN_SECS),
        })
    }

    /// Absolute URL of the auth callback route on this site.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url)
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { var })
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
