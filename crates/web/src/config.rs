//! Directory configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `DELICIOUS_HOST` - Bind address (default: 127.0.0.1)
//! - `DELICIOUS_PORT` - Listen port (default: 7777)
//! - `DELICIOUS_BASE_URL` - Public URL (default: <http://localhost:7777>)
//! - `DELICIOUS_UPLOAD_DIR` - Where store photos are written (default: public/uploads)
//! - `DELICIOUS_STATIC_DIR` - CSS/JS assets (default: crates/web/static)
//! - `DELICIOUS_PHOTO_MAX_WIDTH` - Photos wider than this are downscaled (default: 800)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "7777";
const DEFAULT_BASE_URL: &str = "http://localhost:7777";
const DEFAULT_UPLOAD_DIR: &str = "public/uploads";
const DEFAULT_STATIC_DIR: &str = "crates/web/static";
const DEFAULT_PHOTO_MAX_WIDTH: &str = "800";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Directory application configuration.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: Url,
    /// Directory uploaded photos are written to and served from
    pub upload_dir: PathBuf,
    /// Directory holding CSS and JS
    pub static_dir: PathBuf,
    /// Maximum stored photo width in pixels
    pub photo_max_width: u32,
    /// Login form field names
    pub auth: AuthConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url.as_str())
            .field("upload_dir", &self.upload_dir)
            .field("static_dir", &self.static_dir)
            .field("photo_max_width", &self.photo_max_width)
            .field("auth", &self.auth)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// The username/password login strategy.
///
/// Names the form fields credentials are read from. Handed to the
/// application state at startup rather than registered globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Form field holding the username (an email address)
    pub username_field: String,
    /// Form field holding the password
    pub password_field: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username_field: "email".to_owned(),
            password_field: "password".to_owned(),
        }
    }
}

impl DirectoryConfig {
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env
            .optional("DELICIOUS_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("DELICIOUS_DATABASE_URL".to_string()))?;

        let host = env.parse::<IpAddr>("DELICIOUS_HOST", DEFAULT_HOST)?;
        let port = env.parse::<u16>("DELICIOUS_PORT", DEFAULT_PORT)?;
        let base_url = env.parse::<Url>("DELICIOUS_BASE_URL", DEFAULT_BASE_URL)?;
        let upload_dir = PathBuf::from(env.or_default("DELICIOUS_UPLOAD_DIR", DEFAULT_UPLOAD_DIR));
        let static_dir = PathBuf::from(env.or_default("DELICIOUS_STATIC_DIR", DEFAULT_STATIC_DIR));

        let photo_max_width =
            env.parse::<u32>("DELICIOUS_PHOTO_MAX_WIDTH", DEFAULT_PHOTO_MAX_WIDTH)?;
        if photo_max_width == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DELICIOUS_PHOTO_MAX_WIDTH".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            upload_dir,
            static_dir,
            photo_max_width,
            auth: AuthConfig::default(),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable (or its default) into `T`.
    fn parse<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
