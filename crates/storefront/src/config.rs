//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `VIVERO_API_BASE_URL` - Catalog/order API base URL (default: <https://vivero-back.onrender.com>)
//! - `VIVERO_STORAGE_DIR` - Directory holding persistent and per-tab storage (default: .vivero)
//! - `VIVERO_SESSION_TOKEN` - Bearer token injected by the embedding session provider
//! - `VIVERO_ORDER_PHONE` - Phone number orders are sent to (default: +57 321 926 1465)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://vivero-back.onrender.com";
const DEFAULT_STORAGE_DIR: &str = ".vivero";
const DEFAULT_ORDER_PHONE: &str = "+57 321 926 1465";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
///
/// Implements `Debug` manually to redact the session token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote catalog/order API
    pub api_base_url: Url,
    /// Directory for file-backed storage
    pub storage_dir: PathBuf,
    /// Token supplied by an embedding session provider, if any
    pub session_token: Option<SecretString>,
    /// Phone number used for order hand-off links
    pub order_phone: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("storage_dir", &self.storage_dir)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("order_phone", &self.order_phone)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            session_token: None,
            order_phone: DEFAULT_ORDER_PHONE.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "VIVERO_API_BASE_URL",
            &get_env_or_default("VIVERO_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let storage_dir = PathBuf::from(get_env_or_default("VIVERO_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let session_token = get_optional_env("VIVERO_SESSION_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let order_phone = get_env_or_default("VIVERO_ORDER_PHONE", DEFAULT_ORDER_PHONE);

        Ok(Self {
            api_base_url,
            storage_dir,
            session_token,
            order_phone,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Path of the persistent (shared across tabs) storage file.
    #[must_use]
    pub fn persistent_storage_path(&self) -> PathBuf {
        self.storage_dir.join("local.json")
    }

    /// Path of the tab-scoped storage file for the named tab.
    #[must_use]
    pub fn tab_storage_path(&self, tab: &str) -> PathBuf {
        let safe: String = tab
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.storage_dir.join("tabs").join(format!("{safe}.json"))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_api_base_url() -> Url {
    Url::parse(DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

/// Parse an absolute http(s) base URL.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_valid() {
        let url = parse_base_url("TEST_VAR", "http://127.0.0.1:4000").unwrap();
        assert_eq!(url.port(), Some(4000));
    }

    #[test]
    fn test_parse_base_url_rejects_scheme() {
        let err = parse_base_url("TEST_VAR", "ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("TEST_VAR", "not a url").is_err());
    }

    #[test]
    fn test_tab_storage_path_is_sanitized() {
        let config = StorefrontConfig::default();
        let path = config.tab_storage_path("../evil tab");
        assert!(path.ends_with("tabs/___evil_tab.json"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = StorefrontConfig {
            session_token: Some(SecretString::from("super_secret_bearer")),
            ..StorefrontConfig::default()
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer"));
    }
}
