//! Access configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TIENDA_API_URL` - Backend API base URL (default: `http://127.0.0.1:5000/api`)
//! - `TIENDA_API_KEY` - Bearer token sent to the backend, if it requires one
//! - `TIENDA_SESSION_DIR` - Directory holding the persisted session (default: `.tienda`)
//! - `TIENDA_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `TIENDA_LOGIN_REDIRECT_MS` - Delay before the post-login redirect (default: 1000)
//! - `TIENDA_VERIFY_RETURN_MS` - Delay before returning to login after verification (default: 2000)
//! - `GOOGLE_CLIENT_ID` - OAuth client ID for Google sign-in
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::flow::FlowTimings;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// Blocklist of placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Placeholder value in {0}: {1}")]
    Placeholder(String, String),
}

/// Access engine configuration.
#[derive(Clone)]
pub struct AccessConfig {
    /// Backend API base URL, always ending in `/`.
    pub api_url: Url,
    /// Optional bearer token for the backend.
    pub api_key: Option<SecretString>,
    /// Directory holding the persisted session.
    pub session_dir: PathBuf,
    /// Backend request timeout.
    pub http_timeout: Duration,
    /// Delays applied by the authentication flow.
    pub timings: FlowTimings,
    /// Google OAuth client ID, when Google sign-in is enabled.
    pub google_client_id: Option<String>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("session_dir", &self.session_dir)
            .field("http_timeout", &self.http_timeout)
            .field("timings", &self.timings)
            .field("google_client_id", &self.google_client_id)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or a credential is
    /// still a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AccessConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let api_url = parse_api_url(&env.or_default("TIENDA_API_URL", DEFAULT_API_URL))?;
        let api_key = env
            .optional("TIENDA_API_KEY")
            .map(|key| reject_placeholder(&key, "TIENDA_API_KEY").map(|()| SecretString::from(key)))
            .transpose()?;
        let session_dir = PathBuf::from(env.or_default("TIENDA_SESSION_DIR", ".tienda"));
        let http_timeout = Duration::from_secs(env.number("TIENDA_HTTP_TIMEOUT_SECS", 10)?);
        let timings = FlowTimings {
            login_redirect: Duration::from_millis(env.number("TIENDA_LOGIN_REDIRECT_MS", 1000)?),
            verification_return: Duration::from_millis(
                env.number("TIENDA_VERIFY_RETURN_MS", 2000)?,
            ),
        };

        // Template client IDs look valid but fail at sign-in time.
        let google_client_id = env
            .optional("GOOGLE_CLIENT_ID")
            .map(|id| reject_placeholder(&id, "GOOGLE_CLIENT_ID").map(|()| id))
            .transpose()?;

        Ok(Self {
            api_url,
            api_key,
            session_dir,
            http_timeout,
            timings,
            google_client_id,
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a non-negative integer with a default value.
    fn number(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        self.optional(key).map_or(Ok(default), |v| {
            v.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
            })
        })
    }
}

/// Parse the API base URL so relative endpoint joins keep its path.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidEnvVar("TIENDA_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "TIENDA_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Reject values that still look like template placeholders.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::Placeholder(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AccessConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AccessConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:5000/api/");
        assert_eq!(config.session_dir, PathBuf::from(".tienda"));
        assert_eq!(config.timings, FlowTimings::default());
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.google_client_id.is_none());
    }

    #[test]
    fn test_api_url_keeps_path() {
        let config = load(&[("TIENDA_API_URL", "https://tienda.mx/api/v1")]).unwrap();
        assert_eq!(
            config.api_url.join("login").unwrap().as_str(),
            "https://tienda.mx/api/v1/login"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            load(&[("TIENDA_API_URL", "ftp://tienda.mx")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_timings_override() {
        let config = load(&[
            ("TIENDA_LOGIN_REDIRECT_MS", "0"),
            ("TIENDA_VERIFY_RETURN_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.timings.login_redirect, Duration::ZERO);
        assert_eq!(config.timings.verification_return, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_number() {
        assert!(load(&[("TIENDA_HTTP_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_placeholder_google_client_id_rejected() {
        let result = load(&[(
            "GOOGLE_CLIENT_ID",
            "1234567890-this-is-a-placeholder-key.apps.googleusercontent.com",
        )]);
        assert!(matches!(result, Err(ConfigError::Placeholder(_, _))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = load(&[("TIENDA_API_KEY", "k3Y-9f8a7s6d")]).unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k3Y-9f8a7s6d"));
    }
}
