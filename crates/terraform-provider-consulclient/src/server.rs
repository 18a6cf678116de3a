//! Newline-delimited JSON serving loop.
//!
//! Each input line is one [`Request`]; each produces exactly one
//! [`Response`] line. Requests are handled one at a time, in order.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

/// A request from the plugin host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Configure the provider from its block.
    Configure {
        /// Provider block attributes.
        #[serde(default)]
        config: Value,
    },
    /// Dump the schema of the provider and every type.
    Schema,
    /// Create a resource.
    Create {
        /// Resource type name.
        type_name: String,
        /// Planned attributes.
        config: Value,
    },
    /// Refresh a resource.
    Read {
        /// Resource type name.
        type_name: String,
        /// Current state.
        state: Value,
    },
    /// Update a resource in place.
    Update {
        /// Resource type name.
        type_name: String,
        /// State before the change.
        prior_state: Value,
        /// Planned attributes.
        config: Value,
    },
    /// Destroy a resource.
    Delete {
        /// Resource type name.
        type_name: String,
        /// Current state.
        state: Value,
    },
    /// Read a data source.
    ReadDataSource {
        /// Data source type name.
        type_name: String,
        /// Data source attributes.
        config: Value,
    },
}

/// Answer to one [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Resource ID after the operation; empty when the resource is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resulting state or schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Error message when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn success(state: Option<Value>) -> Self {
        let id = state
            .as_ref()
            .and_then(|s| s.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            ok: true,
            id,
            state,
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            state: None,
            error: Some(message.into()),
        }
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Provider plus the configuration received from the host.
pub struct Server {
    provider: Provider,
    config: Option<ProviderConfig>,
    lookup: EnvLookup,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("provider", &self.provider)
            .field("configured", &self.config.is_some())
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Serve `provider`, reading environment defaults from the process.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self::with_env(provider, |var| std::env::var(var).ok())
    }

    /// Serve `provider` with a custom environment lookup.
    #[must_use]
    pub fn with_env<F>(provider: Provider, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            provider,
            config: None,
            lookup: Box::new(lookup),
        }
    }

    fn meta(&self) -> Result<&ProviderConfig> {
        self.config.as_ref().ok_or(ProviderError::NotConfigured)
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns the provider error for the failed operation.
    pub async fn handle(&mut self, request: Request) -> Result<Option<Value>> {
        match request {
            Request::Configure { config } => {
                self.config = Some(self.provider.configure(config, &self.lookup)?);
                Ok(None)
            }
            Request::Schema => serde_json::to_value(self.provider.schema())
                .map(Some)
                .map_err(|e| ProviderError::Schema(e.to_string())),
            Request::Create { type_name, config } => {
                let meta = self.meta()?;
                self.provider.create(meta, &type_name, config).await.map(Some)
            }
            Request::Read { type_name, state } => {
                let meta = self.meta()?;
                self.provider.read(meta, &type_name, state).await.map(Some)
            }
            Request::Update {
                type_name,
                prior_state,
                config,
            } => {
                let meta = self.meta()?;
                self.provider
                    .update(meta, &type_name, prior_state, config)
                    .await
                    .map(Some)
            }
            Request::Delete { type_name, state } => {
                let meta = self.meta()?;
                self.provider.delete(meta, &type_name, state).await?;
                Ok(None)
            }
            Request::ReadDataSource { type_name, config } => {
                let meta = self.meta()?;
                self.provider
                    .read_data_source(meta, &type_name, config)
                    .await
                    .map(Some)
            }
        }
    }

    async fn respond(&mut self, line: &str) -> Response {
        let request = match serde_json::from_str::<Request>(line) {
            Ok(request) => request,
            Err(e) => return Response::failure(format!("Malformed request: {e}")),
        };
        match self.handle(request).await {
            Ok(state) => Response::success(state),
            Err(e) => {
                error!(error = %e, "Request failed");
                Response::failure(e.to_string())
            }
        }
    }

    /// Run until `reader` is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.respond(&line).await;
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }
        info!("Input closed, shutting down");
        Ok(())
    }
}

/// Serve `provider` over `reader`/`writer` until the input closes.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn serve<R, W>(provider: Provider, reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    Server::new(provider).run(reader, writer).await
}
