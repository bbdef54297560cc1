//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GLPI_API_URL` - Base URL of the GLPI-backed REST API (e.g. `https://api.imp360.fr/api`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_SEARCH_DEBOUNCE_MS` - Search debounce interval (default: 300)
//! - `STOREFRONT_IDENTITY_REVALIDATE_SECS` - Cached identity lifetime (default: 60)
//! - `STOREFRONT_LOGIN_RATE_LIMIT` - Rate limit the login form (default: true)
//! - `STOREFRONT_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the backend API, always ending with a slash
    pub api_url: Url,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Delay between the last keystroke and the search request
    pub search_debounce: Duration,
    /// How long a cached identity is trusted before `GET /me` is called again
    pub identity_revalidate: Duration,
    /// Whether `POST /login` is rate limited per client IP
    pub login_rate_limit: bool,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry settings. Without a DSN Sentry stays disabled.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
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
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("GLPI_API_URL")?)?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let search_debounce =
            Duration::from_millis(parse_env("STOREFRONT_SEARCH_DEBOUNCE_MS", "300")?);
        let identity_revalidate =
            Duration::from_secs(parse_env("STOREFRONT_IDENTITY_REVALIDATE_SECS", "60")?);
        let login_rate_limit = parse_flag(
            "STOREFRONT_LOGIN_RATE_LIMIT",
            &get_env_or_default("STOREFRONT_LOGIN_RATE_LIMIT", "true"),
        )?;
        let log_json = get_optional_env("STOREFRONT_LOG_JSON").is_some();

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        };

        Ok(Self {
            api_url,
            host,
            port,
            base_url,
            search_debounce,
            identity_revalidate,
            login_rate_limit,
            log_json,
            sentry,
        })
    }

    /// Configuration for tests and local tooling: defaults everywhere, the
    /// given backend, no rate limiting.
    #[must_use]
    pub fn for_backend(api_url: Url) -> Self {
        Self {
            api_url,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            search_debounce: Duration::from_millis(300),
            identity_revalidate: Duration::from_secs(60),
            login_rate_limit: false,
            log_json: false,
            sentry: SentryConfig::default(),
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend URL, normalizing it to end with a slash so that
/// relative endpoint paths join under it.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("GLPI_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "GLPI_API_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
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
    fn test_api_url_gets_trailing_slash() {
        let url = parse_api_url("https://glpi.example.fr/api").unwrap();
        assert_eq!(url.as_str(), "https://glpi.example.fr/api/");
        assert_eq!(
            url.join("products/role/ordinateurs").unwrap().as_str(),
            "https://glpi.example.fr/api/products/role/ordinateurs"
        );
    }

    #[test]
    fn test_api_url_rejects_relative() {
        let err = parse_api_url("/api").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "GLPI_API_URL"));
        assert!(parse_api_url("mailto:dev@imp360.fr").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("X", "true").unwrap());
        assert!(parse_flag("X", " ON ").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "peut-être").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = StorefrontConfig::for_backend(Url::parse("http://127.0.0.1:9000/").unwrap());
        config.port = 8080;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_secure_cookies_follow_base_url() {
        let mut config = StorefrontConfig::for_backend(Url::parse("http://127.0.0.1:9000/").unwrap());
        assert!(!config.secure_cookies());
        config.base_url = "https://boutique.imp360.fr".to_string();
        assert!(config.secure_cookies());
    }
}
