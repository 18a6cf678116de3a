//! ACL calls bound to one datacenter and token.

use crate::error::{ConsulResultExt, Result};
use consulclient_api::models::AclEntry;
use consulclient_api::ConsulApi;
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use tracing::debug;

/// Wrapper around the ACL endpoints with datacenter and token fixed once.
#[derive(Debug)]
pub struct AclClient<'a> {
    client: &'a ConsulClient,
    q_opts: QueryOptions,
    w_opts: WriteOptions,
}

impl<'a> AclClient<'a> {
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

    /// Fetch an entry; `None` if Consul does not know the ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn read(&self, id: &str) -> Result<Option<AclEntry>> {
        debug!(id, dc = self.dc(), "Reading ACL");
        self.client
            .acl()
            .info(id, &self.q_opts)
            .await
            .context(|| format!("Failed to read Consul ACL '{id}'"))
    }

    /// Create an entry and store the assigned ID in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create(&self, acl: &mut AclEntry) -> Result<()> {
        debug!(name = %acl.name, dc = self.dc(), "Creating ACL");
        acl.id = self
            .client
            .acl()
            .create(acl, &self.w_opts)
            .await
            .context(|| format!("Failed to write Consul ACL '{}'", acl.name))?;
        Ok(())
    }

    /// Update an existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update(&self, acl: &AclEntry) -> Result<()> {
        debug!(name = %acl.name, dc = self.dc(), "Setting ACL");
        self.client
            .acl()
            .update(acl, &self.w_opts)
            .await
            .context(|| format!("Failed to write Consul ACL '{}'", acl.name))
    }

    /// Destroy an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        debug!(id, dc = self.dc(), "Deleting ACL");
        self.client
            .acl()
            .destroy(id, &self.w_opts)
            .await
            .context(|| format!("Failed to delete Consul ACL '{id}'"))
    }
}
