//! Connection settings for Consul clients.
//!
//! This module provides the settings needed to reach a Consul agent: the
//! address and scheme, an optional default datacenter, credentials and TLS
//! material.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Default agent address when none is configured.
pub const DEFAULT_ADDRESS: &str = "localhost:8500";

/// Default URL scheme when none is configured.
pub const DEFAULT_SCHEME: &str = "http";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for connecting to a single Consul agent.
#[derive(Debug, Clone, Validate)]
pub struct ConnectionConfig {
    /// Agent address, `host:port` or a full URL
    #[validate(length(min = 1))]
    pub address: String,

    /// URL scheme used when `address` carries none
    #[validate(custom(function = "validate_scheme"))]
    pub scheme: String,

    /// Default datacenter applied to requests that do not name one
    pub datacenter: Option<String>,

    /// HTTP basic auth in `user` or `user:password` form
    pub http_auth: Option<SecretString>,

    /// Default ACL token
    pub token: Option<SecretString>,

    /// PEM bundle used to verify the agent certificate
    pub ca_file: Option<PathBuf>,

    /// PEM client certificate
    pub cert_file: Option<PathBuf>,

    /// PEM client key
    pub key_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
}

fn validate_scheme(scheme: &str) -> Result<(), ValidationError> {
    match scheme {
        "http" | "https" => Ok(()),
        _ => Err(ValidationError::new("scheme")),
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given agent address.
    ///
    /// An empty address falls back to [`DEFAULT_ADDRESS`].
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: non_empty(address).unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            scheme: DEFAULT_SCHEME.to_string(),
            datacenter: None,
            http_auth: None,
            token: None,
            ca_file: None,
            cert_file: None,
            key_file: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Set the URL scheme. An empty scheme keeps the default.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        if let Some(scheme) = non_empty(scheme) {
            self.scheme = scheme;
        }
        self
    }

    /// Set the default datacenter. An empty name clears it.
    #[must_use]
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = non_empty(datacenter);
        self
    }

    /// Set HTTP basic auth in `user` or `user:password` form.
    #[must_use]
    pub fn with_http_auth(mut self, http_auth: impl Into<String>) -> Self {
        self.http_auth = non_empty(http_auth).map(SecretString::from);
        self
    }

    /// Set the default ACL token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = non_empty(token).map(SecretString::from);
        self
    }

    /// Set the CA bundle path.
    #[must_use]
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Set the client certificate and key paths.
    #[must_use]
    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(cert.into());
        self.key_file = Some(key.into());
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Split the basic auth setting into username and optional password.
    ///
    /// The value is split on the first `:`; without a colon the whole value
    /// is the username.
    #[must_use]
    pub fn basic_auth(&self) -> Option<(String, Option<SecretString>)> {
        let raw = self.http_auth.as_ref()?.expose_secret();
        match raw.split_once(':') {
            Some((user, password)) => {
                Some((user.to_string(), Some(SecretString::from(password.to_string()))))
            }
            None => Some((raw.to_string(), None)),
        }
    }

    /// Build the agent base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the address and scheme do not form a valid URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        let raw = if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("{}://{}", self.scheme, self.address)
        };
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::ConfigError(format!("Invalid Consul address '{raw}': {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, the scheme is unknown, the
    /// timeout is out of range, or only one half of the client certificate
    /// pair is set.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        if self.cert_file.is_some() != self.key_file.is_some() {
            return Err(Error::ConfigError(
                "cert_file and key_file must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.address, "localhost:8500");
        assert_eq!(config.scheme, "http");
        assert!(config.datacenter.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = ConnectionConfig::new("")
            .with_scheme("")
            .with_datacenter("")
            .with_token("");
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.scheme, DEFAULT_SCHEME);
        assert!(config.datacenter.is_none());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_base_url() {
        let url = ConnectionConfig::new("consul.example.com:8501")
            .with_scheme("https")
            .base_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://consul.example.com:8501/");

        let url = ConnectionConfig::new("http://10.0.0.1:8500/proxy")
            .base_url()
            .unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:8500/proxy/");
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let config = ConnectionConfig::new("localhost:8500").with_scheme("ftp");
        assert!(matches!(config.check(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_half_client_cert_rejected() {
        let mut config = ConnectionConfig::default();
        config.cert_file = Some(PathBuf::from("/tmp/cert.pem"));
        assert!(config.check().is_err());
    }

    #[test]
    fn test_basic_auth_split() {
        let config = ConnectionConfig::default().with_http_auth("admin:s3cr:et");
        let (user, password) = config.basic_auth().unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password.unwrap().expose_secret(), "s3cr:et");

        let config = ConnectionConfig::default().with_http_auth("admin");
        let (user, password) = config.basic_auth().unwrap();
        assert_eq!(user, "admin");
        assert!(password.is_none());

        assert!(ConnectionConfig::default().basic_auth().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ConnectionConfig::default().with_token("super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
