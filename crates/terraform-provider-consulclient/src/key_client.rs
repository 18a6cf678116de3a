//! Key/value calls bound to one datacenter and token.

use crate::error::{ConsulResultExt, Result};
use consulclient_api::models::KvPair;
use consulclient_api::ConsulApi;
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use tracing::debug;

/// Wrapper around the KV endpoints with datacenter and token fixed once.
#[derive(Debug)]
pub struct KeyClient<'a> {
    client: &'a ConsulClient,
    q_opts: QueryOptions,
    w_opts: WriteOptions,
}

impl<'a> KeyClient<'a> {
    /// Bind to `dc` and `token`; empty strings leave the client defaults.
    #[must_use]
    pub fn new(client: &'a ConsulClient, dc: &str, token: &str) -> Self {
        Self {
            client,
            q_opts: QueryOptions::new(dc, token),
            w_opts: WriteOptions::new(dc, token),
        }
    }

    fn dc(&self) -> &str {
        self.w_opts.datacenter.as_deref().unwrap_or_default()
    }

    /// Value at `path`, `""` when the key is missing or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, path: &str) -> Result<String> {
        debug!(path, dc = self.dc(), "Reading key");
        let pair = self
            .client
            .kv()
            .get(path, &self.q_opts)
            .await
            .context(|| format!("Failed to read Consul key '{path}'"))?;
        Ok(pair.map(|p| p.decoded_value()).unwrap_or_default())
    }

    /// Every pair under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_under_prefix(&self, prefix: &str) -> Result<Vec<KvPair>> {
        debug!(prefix, dc = self.dc(), "Listing keys");
        self.client
            .kv()
            .list(prefix, &self.q_opts)
            .await
            .context(|| format!("Failed to list Consul keys under prefix '{prefix}'"))
    }

    /// Write `value` at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put(&self, path: &str, value: &str) -> Result<()> {
        debug!(path, dc = self.dc(), "Setting key");
        self.client
            .kv()
            .put(path, value.as_bytes(), &self.w_opts)
            .await
            .context(|| format!("Failed to set Consul key '{path}'"))
    }

    /// Delete the key at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!(path, dc = self.dc(), "Deleting key");
        self.client
            .kv()
            .delete(path, &self.w_opts)
            .await
            .context(|| format!("Failed to delete Consul key '{path}'"))
    }

    /// Delete every key under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_under_prefix(&self, prefix: &str) -> Result<()> {
        debug!(prefix, dc = self.dc(), "Deleting keys under prefix");
        self.client
            .kv()
            .delete_tree(prefix, &self.w_opts)
            .await
            .context(|| format!("Failed to delete Consul keys under prefix '{prefix}'"))
    }
}
