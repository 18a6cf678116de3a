//! Provider-level connection settings.
//!
//! [`ProviderConfig`] is built once when the host configures the provider
//! and passed by reference into every resource operation. Each operation
//! derives a resolved copy in which the resource's own connection
//! attributes override the provider's.

use crate::error::{ProviderError, Result};
use crate::resource_data::ResourceData;
use crate::schema::{apply_defaults, ResourceSchema, Schema};
use consulclient_core::{ConnectionConfig, ConsulClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Default agent address.
pub const DEFAULT_HOST: &str = "localhost:8500";

/// Default URL scheme.
pub const DEFAULT_SCHEME: &str = "http";

/// Schema of the `provider "consulclient"` block.
#[must_use]
pub fn provider_schema() -> ResourceSchema {
    let mut schema = ResourceSchema::new();
    schema.insert("datacenter", Schema::string().optional());
    schema.insert(
        "host",
        Schema::string()
            .optional()
            .env_default(&["CONSUL_ADDRESS", "CONSUL_HTTP_ADDR"])
            .default_value(DEFAULT_HOST),
    );
    schema.insert(
        "scheme",
        Schema::string()
            .optional()
            .env_default(&["CONSUL_SCHEME", "CONSUL_HTTP_SCHEME"])
            .default_value(DEFAULT_SCHEME),
    );
    schema.insert(
        "http_auth",
        Schema::string().optional().env_default(&["CONSUL_HTTP_AUTH"]),
    );
    schema.insert(
        "ca_file",
        Schema::string().optional().env_default(&["CONSUL_CA_FILE"]),
    );
    schema.insert(
        "cert_file",
        Schema::string().optional().env_default(&["CONSUL_CERT_FILE"]),
    );
    schema.insert(
        "key_file",
        Schema::string().optional().env_default(&["CONSUL_KEY_FILE"]),
    );
    schema.insert(
        "token",
        Schema::string()
            .optional()
            .env_default(&["CONSUL_TOKEN", "CONSUL_HTTP_TOKEN"]),
    );
    schema
}

/// Connection parameters for a Consul agent.
///
/// Empty strings mean "not set".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Datacenter to operate in.
    pub datacenter: String,
    /// Agent address, `host:port`.
    pub host: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Basic auth as `user` or `user:password`.
    pub http_auth: String,
    /// ACL token.
    pub token: String,
    /// CA bundle path.
    pub ca_file: String,
    /// Client certificate path.
    pub cert_file: String,
    /// Client key path.
    pub key_file: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redacted(value: &str) -> &'static str {
            if value.is_empty() {
                ""
            } else {
                "[REDACTED]"
            }
        }

        f.debug_struct("ProviderConfig")
            .field("datacenter", &self.datacenter)
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("http_auth", &redacted(&self.http_auth))
            .field("token", &redacted(&self.token))
            .field("ca_file", &self.ca_file)
            .field("cert_file", &self.cert_file)
            .field("key_file", &self.key_file)
            .finish()
    }
}

fn pick(resource: &str, provider: &str) -> String {
    if resource.is_empty() {
        provider.to_string()
    } else {
        resource.to_string()
    }
}

impl ProviderConfig {
    /// Decode the provider block, filling unset fields from the environment
    /// and static defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Decode`] if a field has the wrong type.
    pub fn from_attributes<F>(mut raw: Map<String, Value>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        apply_defaults(&provider_schema(), &mut raw, &lookup);
        raw.retain(|_, v| !v.is_null());
        serde_json::from_value(Value::Object(raw))
            .map_err(|e| ProviderError::decode("provider", e.to_string()))
    }

    /// Decode the provider block using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Decode`] if a field has the wrong type.
    pub fn from_env_and_attributes(raw: Map<String, Value>) -> Result<Self> {
        Self::from_attributes(raw, |var| std::env::var(var).ok())
    }

    /// Connection settings of a resource instance.
    #[must_use]
    pub fn from_resource(d: &ResourceData) -> Self {
        Self {
            datacenter: d.get_str("datacenter").to_string(),
            host: d.get_str("host").to_string(),
            scheme: d.get_str("scheme").to_string(),
            http_auth: d.get_str("http_auth").to_string(),
            token: d.get_str("token").to_string(),
            ca_file: d.get_str("ca_file").to_string(),
            cert_file: d.get_str("cert_file").to_string(),
            key_file: d.get_str("key_file").to_string(),
        }
    }

    /// Merge `overrides` over `self`: every non-empty override wins.
    #[must_use]
    pub fn resolve_with(&self, overrides: &Self) -> Self {
        Self {
            datacenter: pick(&overrides.datacenter, &self.datacenter),
            host: pick(&overrides.host, &self.host),
            scheme: pick(&overrides.scheme, &self.scheme),
            http_auth: pick(&overrides.http_auth, &self.http_auth),
            token: pick(&overrides.token, &self.token),
            ca_file: pick(&overrides.ca_file, &self.ca_file),
            cert_file: pick(&overrides.cert_file, &self.cert_file),
            key_file: pick(&overrides.key_file, &self.key_file),
        }
    }

    /// Settings for one resource operation.
    #[must_use]
    pub fn get_resolved_config(&self, d: &ResourceData) -> Self {
        self.resolve_with(&Self::from_resource(d))
    }

    /// Translate into core connection settings.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.host.as_str())
            .with_scheme(self.scheme.as_str())
            .with_datacenter(self.datacenter.as_str())
            .with_http_auth(self.http_auth.as_str())
            .with_token(self.token.as_str());
        if !self.ca_file.is_empty() {
            config = config.with_ca_file(&self.ca_file);
        }
        config.cert_file = (!self.cert_file.is_empty()).then(|| PathBuf::from(&self.cert_file));
        config.key_file = (!self.key_file.is_empty()).then(|| PathBuf::from(&self.key_file));
        config
    }

    /// Open a Consul client with these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or TLS material cannot
    /// be loaded.
    pub fn new_client(&self) -> Result<ConsulClient> {
        let connection = self.connection_config();
        ConsulClient::from_config(&connection).map_err(|source| {
            ProviderError::consul(
                format!(
                    "Failed to configure Consul client for '{}://{}'",
                    connection.scheme, connection.address
                ),
                source,
            )
        })
    }
}
