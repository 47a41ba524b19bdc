//! Client configuration
//!
//! A [`ClientConfig`] can be built in code, read from `EWHS_*` environment
//! variables, or loaded from a TOML file:
//!
//! ```toml
//! username = "api-user"
//! password = "secret"
//! customer_code = "CUST01"
//! wms_code = "WMS01"
//! api_url = "https://api.ewarehousing.com"
//! timeout_seconds = 30
//! ```

use crate::ewhs_api::types::EwhsError;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production API endpoint
pub const DEFAULT_API_URL: &str = "https://api.ewarehousing.com";

const ENV_USERNAME: &str = "EWHS_USERNAME";
const ENV_PASSWORD: &str = "EWHS_PASSWORD";
const ENV_CUSTOMER_CODE: &str = "EWHS_CUSTOMER_CODE";
const ENV_WMS_CODE: &str = "EWHS_WMS_CODE";
const ENV_API_URL: &str = "EWHS_API_URL";
const ENV_TIMEOUT_SECONDS: &str = "EWHS_TIMEOUT_SECONDS";

/// Settings for [`crate::EwhsClient`]
#[derive(Debug)]
pub struct ClientConfig {
    pub username: String,
    pub password: SecretString,
    /// Sent as `X-Customer-Code` on every call
    pub customer_code: Option<String>,
    /// Sent as `X-Wms-Code` on every call
    pub wms_code: Option<String>,
    /// Overrides [`DEFAULT_API_URL`]
    pub api_url: Option<String>,
    /// Overall timeout per HTTP request
    pub timeout: Option<Duration>,
}

/// On-disk representation
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    username: String,
    password: String,
    #[serde(default)]
    customer_code: Option<String>,
    #[serde(default)]
    wms_code: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl From<ConfigFile> for ClientConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            username: file.username,
            password: SecretString::from(file.password),
            customer_code: file.customer_code,
            wms_code: file.wms_code,
            api_url: file.api_url,
            timeout: file.timeout_seconds.map(Duration::from_secs),
        }
    }
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            customer_code: None,
            wms_code: None,
            api_url: None,
            timeout: None,
        }
    }

    pub fn with_customer_code(mut self, customer_code: impl Into<String>) -> Self {
        self.customer_code = Some(customer_code.into());
        self
    }

    pub fn with_wms_code(mut self, wms_code: impl Into<String>) -> Self {
        self.wms_code = Some(wms_code.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Base URL without a trailing slash
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    /// Read configuration from `EWHS_*` environment variables
    ///
    /// `EWHS_USERNAME` and `EWHS_PASSWORD` are required.
    pub fn from_env() -> Result<Self, EwhsError> {
        let username = required_env(ENV_USERNAME)?;
        let password = required_env(ENV_PASSWORD)?;

        let timeout = match optional_env(ENV_TIMEOUT_SECONDS) {
            Some(raw) => Some(Duration::from_secs(raw.parse().map_err(|e| {
                EwhsError::Config(format!("{} must be a number of seconds: {}", ENV_TIMEOUT_SECONDS, e))
            })?)),
            None => None,
        };

        let config = Self {
            username,
            password: SecretString::from(password),
            customer_code: optional_env(ENV_CUSTOMER_CODE),
            wms_code: optional_env(ENV_WMS_CODE),
            api_url: optional_env(ENV_API_URL),
            timeout,
        };
        config.validate()?;

        tracing::debug!("Loaded client configuration from environment");
        Ok(config)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, EwhsError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| EwhsError::Config(format!("Invalid configuration file: {}", e)))?;
        let config = Self::from(file);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EwhsError> {
        let path = path.as_ref();
        tracing::debug!("Loading client configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read configuration file {}: {}", path.display(), e);
            EwhsError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// `<user config dir>/ewhs/config.toml`, when the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ewhs").join("config.toml"))
    }

    /// Load configuration from [`ClientConfig::default_path`]
    pub fn from_default_file() -> Result<Self, EwhsError> {
        let path = Self::default_path().ok_or_else(|| {
            EwhsError::Config("No user configuration directory on this platform".to_string())
        })?;
        Self::from_file(path)
    }

    /// Check the settings a client cannot work without
    pub fn validate(&self) -> Result<(), EwhsError> {
        use secrecy::ExposeSecret;

        if self.username.trim().is_empty() {
            return Err(EwhsError::Config("username must not be empty".to_string()));
        }
        if self.password.expose_secret().is_empty() {
            return Err(EwhsError::Config("password must not be empty".to_string()));
        }

        let url = self.api_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EwhsError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                url
            )));
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(EwhsError::Config("timeout must be greater than zero".to_string()));
        }

        Ok(())
    }
}

fn required_env(name: &str) -> Result<String, EwhsError> {
    optional_env(name).ok_or_else(|| EwhsError::Config(format!("{} must be set", name)))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
