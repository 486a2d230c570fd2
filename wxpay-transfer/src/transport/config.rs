//! Transport configuration types.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigurationError, Result};

/// Production API host.
pub const DEFAULT_API_BASE: &str = "https://api.mch.weixin.qq.com";

/// HTTP transport configuration.
///
/// # Examples
///
/// ```toml
/// [http]
/// api_base = "https://api2.mch.weixin.qq.com"
/// timeout_secs = 20
/// connect_timeout_secs = 5
/// http_version = "http1"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// API base URL. Endpoint paths are appended to it, so a path prefix such as
    /// `/sandboxnew` is kept.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds. Always applied.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum idle connections per host and merchant.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// HTTP version preference.
    #[serde(default)]
    pub http_version: HttpVersion,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle(),
            http_version: HttpVersion::default(),
        }
    }
}

impl HttpConfig {
    /// Validates configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if:
    /// - `timeout_secs` is outside 1-300 seconds
    /// - `connect_timeout_secs` is outside 1-60 seconds
    /// - `api_base` is not an HTTPS URL
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(invalid("timeout_secs must be between 1 and 300"));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(invalid("connect_timeout_secs must be between 1 and 60"));
        }
        self.api_base_url().map(|_| ())
    }

    /// Parses `api_base`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfig`] if the URL is malformed or not HTTPS.
    pub fn api_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base)
            .map_err(|e| invalid(format!("invalid api_base '{}': {e}", self.api_base)))?;
        if url.scheme() != "https" {
            return Err(invalid(format!("api_base must use HTTPS, got: {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid(format!("api_base has no host: {}", self.api_base)));
        }
        Ok(url)
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// HTTP version preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 only, without negotiation.
    Http2,
    /// Negotiate through ALPN.
    #[default]
    Auto,
}

fn invalid(message: impl Into<String>) -> crate::error::TransferError {
    ConfigurationError::InvalidConfig(message.into()).into()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_owned()
}

fn default_pool_max_idle() -> usize {
    16
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.http_version, HttpVersion::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_config_from_toml() {
        let config: HttpConfig = toml::from_str(
            r#"
            api_base = "https://api2.mch.weixin.qq.com"
            timeout_secs = 20
            http_version = "http1"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.http_version, HttpVersion::Http1);
        assert_eq!(config.api_base_url().unwrap().host_str(), Some("api2.mch.weixin.qq.com"));
    }

    #[test]
    fn test_timeout_bounds() {
        let zero = HttpConfig { timeout_secs: 0, ..Default::default() };
        assert!(zero.validate().is_err());
        let long = HttpConfig { timeout_secs: 301, ..Default::default() };
        assert!(long.validate().is_err());
        let connect = HttpConfig { connect_timeout_secs: 61, ..Default::default() };
        assert!(connect.validate().is_err());
        let edge = HttpConfig { timeout_secs: 300, connect_timeout_secs: 60, ..Default::default() };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_api_base_must_be_https() {
        let config = HttpConfig { api_base: "http://api.mch.weixin.qq.com".into(), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HTTPS"));

        let config = HttpConfig { api_base: "not a url".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }
}
