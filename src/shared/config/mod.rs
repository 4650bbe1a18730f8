//! Gateway configuration
//!
//! Endpoint and key of the hosted backend plus the table names the gateway
//! reads and writes. Built through [`GatewayConfigBuilder`], from environment
//! variables, or from a TOML document.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default table holding `{user_id, role}` rows
pub const DEFAULT_ROLE_TABLE: &str = "user_roles";
/// Default table holding display profiles
pub const DEFAULT_PROFILE_TABLE: &str = "profiles";
/// Where unauthenticated callers are sent by `require_auth`
pub const DEFAULT_LOGIN_REDIRECT: &str = "/login.html";

/// Environment variable names read by [`GatewayConfig::from_env`]
pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_LOGIN_REDIRECT: &str = "ROLEGATE_LOGIN_REDIRECT";

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Project URL without trailing slash, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key sent as `apikey`
    pub anon_key: String,
    pub role_table: String,
    pub profile_table: String,
    pub login_redirect: String,
    /// Per-request timeout; `None` leaves requests unbounded
    pub request_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Create a new GatewayConfigBuilder
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Read `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional
    /// `ROLEGATE_LOGIN_REDIRECT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(ENV_URL).map_err(|_| ConfigError::MissingValue(ENV_URL))?;
        let anon_key =
            std::env::var(ENV_ANON_KEY).map_err(|_| ConfigError::MissingValue(ENV_ANON_KEY))?;

        let mut builder = Self::builder().url(url).anon_key(anon_key);
        if let Ok(redirect) = std::env::var(ENV_LOGIN_REDIRECT) {
            builder = builder.login_redirect(redirect);
        }
        builder.build()
    }

    /// Parse a TOML document such as
    ///
    /// ```toml
    /// url = "https://xyz.supabase.co"
    /// anon_key = "public-anon-key"
    /// role_table = "user_roles"
    /// request_timeout_secs = 10
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut builder = Self::builder();
        if let Some(url) = file.url {
            builder = builder.url(url);
        }
        if let Some(key) = file.anon_key {
            builder = builder.anon_key(key);
        }
        if let Some(table) = file.role_table {
            builder = builder.role_table(table);
        }
        if let Some(table) = file.profile_table {
            builder = builder.profile_table(table);
        }
        if let Some(redirect) = file.login_redirect {
            builder = builder.login_redirect(redirect);
        }
        if let Some(secs) = file.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Full URL of an auth endpoint, e.g. `auth_url("/signup")`
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Full URL of a table endpoint
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = reqwest::Url::parse(&self.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("anon_key"));
        }
        if self.role_table.is_empty() {
            return Err(ConfigError::MissingValue("role_table"));
        }
        if self.profile_table.is_empty() {
            return Err(ConfigError::MissingValue("profile_table"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    url: Option<String>,
    anon_key: Option<String>,
    role_table: Option<String>,
    profile_table: Option<String>,
    login_redirect: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// Builder for GatewayConfig
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    url: Option<String>,
    anon_key: Option<String>,
    role_table: Option<String>,
    profile_table: Option<String>,
    login_redirect: Option<String>,
    request_timeout: Option<Duration>,
}

impl GatewayConfigBuilder {
    /// Set the project URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the anon key
    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    pub fn role_table(mut self, table: impl Into<String>) -> Self {
        self.role_table = Some(table.into());
        self
    }

    pub fn profile_table(mut self, table: impl Into<String>) -> Self {
        self.profile_table = Some(table.into());
        self
    }

    pub fn login_redirect(mut self, target: impl Into<String>) -> Self {
        self.login_redirect = Some(target.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        let url = self.url.ok_or(ConfigError::MissingValue("url"))?;
        let anon_key = self.anon_key.ok_or(ConfigError::MissingValue("anon_key"))?;

        let config = GatewayConfig {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            role_table: self
                .role_table
                .unwrap_or_else(|| DEFAULT_ROLE_TABLE.to_string()),
            profile_table: self
                .profile_table
                .unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_string()),
            login_redirect: self
                .login_redirect
                .unwrap_or_else(|| DEFAULT_LOGIN_REDIRECT.to_string()),
            request_timeout: self.request_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid config file: {0}")]
    Parse(String),
}
