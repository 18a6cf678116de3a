//! HTTP client for the Consul agent API.
//!
//! This module provides the transport shared by every endpoint binding:
//! base URL handling, ACL token and basic-auth injection, default datacenter
//! scoping, TLS material loading and status-to-error mapping. Requests are
//! issued exactly once; Consul failures are surfaced to the caller unchanged.

use crate::config::ConnectionConfig;
use crate::error::{map_status_to_error, Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Certificate, Identity, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Header carrying the ACL token.
pub const TOKEN_HEADER: &str = "X-Consul-Token";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Seconds an idle pooled connection to the agent is kept open.
pub const DEFAULT_POOL_IDLE_SECS: u64 = 90;

/// Idle connections kept per agent.
pub const DEFAULT_POOL_MAX_IDLE: usize = 10;

const USER_AGENT: &str = concat!("consulclient/", env!("CARGO_PKG_VERSION"));

/// Transport tuning for the underlying `reqwest` client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long an idle pooled connection survives.
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Emit a `debug!` line per request.
    pub log_requests: bool,
    /// Accept gzip-encoded responses.
    pub gzip: bool,
}

impl ClientConfig {
    /// Defaults: 30s timeout, 90s idle pool, request logging and gzip on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_SECS),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE,
            log_requests: true,
            gzip: true,
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Size the idle connection pool.
    #[must_use]
    pub const fn with_pool(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Turn off per-request logging.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.log_requests = false;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ConsulClient`].
#[derive(Debug, Clone)]
pub struct ConsulClientBuilder {
    base_url: Url,
    http_config: ClientConfig,
    datacenter: Option<String>,
    token: Option<SecretString>,
    basic_auth: Option<(String, Option<SecretString>)>,
    ca_file: Option<PathBuf>,
    client_identity: Option<(PathBuf, PathBuf)>,
}

impl ConsulClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            http_config: ClientConfig::default(),
            datacenter: None,
            token: None,
            basic_auth: None,
            ca_file: None,
            client_identity: None,
        })
    }

    /// Create a builder from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        config.check()?;

        let mut builder = Self::new(config.base_url()?)?
            .with_http_config(ClientConfig::new().with_timeout(config.timeout()));
        builder.datacenter.clone_from(&config.datacenter);
        builder.token.clone_from(&config.token);
        builder.basic_auth = config.basic_auth();
        builder.ca_file.clone_from(&config.ca_file);
        if let (Some(cert), Some(key)) = (&config.cert_file, &config.key_file) {
            builder.client_identity = Some((cert.clone(), key.clone()));
        }
        Ok(builder)
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Set the datacenter applied to requests that do not name one.
    #[must_use]
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        let datacenter = datacenter.into();
        self.datacenter = (!datacenter.is_empty()).then_some(datacenter);
        self
    }

    /// Configure the default ACL token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then(|| SecretString::from(token));
        self
    }

    /// Configure HTTP basic authentication credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.basic_auth = Some((username.into(), password.map(SecretString::from)));
        self
    }

    /// Trust the PEM bundle at `path` in addition to the system roots.
    #[must_use]
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Present the PEM certificate and key as client identity.
    #[must_use]
    pub fn with_client_identity(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_identity = Some((cert.into(), key.into()));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS material cannot be read or parsed, or the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<ConsulClient> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.http_config.timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .gzip(self.http_config.gzip);

        if let Some(path) = &self.ca_file {
            let pem = read_pem(path)?;
            let certificates = Certificate::from_pem_bundle(&pem)
                .map_err(|e| Error::TlsError(format!("{}: {e}", path.display())))?;
            for certificate in certificates {
                http = http.add_root_certificate(certificate);
            }
        }

        if let Some((cert, key)) = &self.client_identity {
            let mut pem = read_pem(cert)?;
            pem.extend_from_slice(&read_pem(key)?);
            let identity = Identity::from_pem(&pem)
                .map_err(|e| Error::TlsError(format!("{}: {e}", cert.display())))?;
            http = http.identity(identity);
        }

        let http = http
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        if self.http_config.log_requests {
            info!(
                address = %self.base_url,
                datacenter = self.datacenter.as_deref().unwrap_or(""),
                "Consul client configured"
            );
        }

        Ok(ConsulClient {
            http,
            base_url: self.base_url,
            datacenter: self.datacenter,
            token: self.token,
            basic_auth: self.basic_auth,
            log_requests: self.http_config.log_requests,
        })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::TlsError(format!("{}: {e}", path.display())))
}

/// Asynchronous Consul agent client.
#[derive(Clone)]
pub struct ConsulClient {
    http: reqwest::Client,
    base_url: Url,
    datacenter: Option<String>,
    token: Option<SecretString>,
    basic_auth: Option<(String, Option<SecretString>)>,
    log_requests: bool,
}

impl std::fmt::Debug for ConsulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulClient")
            .field("base_url", &self.base_url.as_str())
            .field("datacenter", &self.datacenter)
            .finish_non_exhaustive()
    }
}

impl ConsulClient {
    /// Construct a client directly from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        ConsulClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or TLS material cannot
    /// be loaded.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        ConsulClientBuilder::from_config(config)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the default datacenter, if one is configured.
    #[must_use]
    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    /// Issue a request and deserialize the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, Consul answers with a
    /// non-success status, or the body cannot be decoded.
    pub async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
        token: Option<&str>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .execute(method, path, params, token, |mut request| {
                if let Some(payload) = body {
                    request = request.json(payload);
                }
                request
            })
            .await?;

        response.json::<R>().await.map_err(Error::from)
    }

    /// Issue a request whose response body is irrelevant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Consul answers with a
    /// non-success status.
    pub async fn send_empty<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
        token: Option<&str>,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, params, token, |mut request| {
            if let Some(payload) = body {
                request = request.json(payload);
            }
            request
        })
        .await
        .map(|_| ())
    }

    /// Issue a request carrying a raw byte body, as the KV store expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Consul answers with a
    /// non-success status.
    pub async fn send_bytes(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        params: &[(&'static str, String)],
        token: Option<&str>,
    ) -> Result<Response> {
        self.execute(method, path, params, token, |request| request.body(body))
            .await
    }

    /// Resolve an API path against the base URL.
    ///
    /// Each `/`-separated piece becomes one path segment, percent-encoded, so
    /// keys holding `?`, `#` or `%` stay inside the path. Empty pieces are
    /// kept, which preserves trailing slashes on KV folder keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the base URL cannot carry a path.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Issue a single request.
    ///
    /// The client's default datacenter is added as `dc` unless `params`
    /// already names one. `token` overrides the client's default ACL token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Consul answers with a
    /// non-success status.
    pub async fn execute<F>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        token: Option<&str>,
        configure: F,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.endpoint(path)?;

        if self.log_requests {
            debug!(%method, %url, "Consul request");
        }

        let mut request = self.http.request(method, url).query(params);

        if let Some(datacenter) = &self.datacenter {
            if !params.iter().any(|(key, _)| *key == "dc") {
                request = request.query(&[("dc", datacenter.as_str())]);
            }
        }

        match token.filter(|t| !t.is_empty()) {
            Some(token) => request = request.header(TOKEN_HEADER, token),
            None => {
                if let Some(token) = &self.token {
                    request = request.header(TOKEN_HEADER, token.expose_secret());
                }
            }
        }

        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, password.as_ref().map(|p| p.expose_secret()));
        }

        let response = configure(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(map_status_to_error(status, text.trim().to_string()))
    }
}
