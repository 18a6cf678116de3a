//! Catalog endpoints.

use crate::models::{CatalogDeregistration, CatalogNode, CatalogRegistration, CatalogService, Node};
use crate::Result;
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use reqwest::Method;
use std::collections::BTreeMap;
use tracing::debug;

/// Catalog endpoints (`/v1/catalog/*`).
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    client: &'a ConsulClient,
}

impl<'a> Catalog<'a> {
    /// Bind the endpoint group to a client.
    #[must_use]
    pub const fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Register a node and optionally one service on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn register(&self, registration: &CatalogRegistration, opts: &WriteOptions) -> Result<()> {
        debug!(node = %registration.node, address = %registration.address, "catalog register");
        self.client
            .send_empty(
                Method::PUT,
                "v1/catalog/register",
                Some(registration),
                &opts.to_pairs(),
                opts.token(),
            )
            .await
    }

    /// Remove a node, or one of its services or checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn deregister(&self, deregistration: &CatalogDeregistration, opts: &WriteOptions) -> Result<()> {
        debug!(node = %deregistration.node, "catalog deregister");
        self.client
            .send_empty(
                Method::PUT,
                "v1/catalog/deregister",
                Some(deregistration),
                &opts.to_pairs(),
                opts.token(),
            )
            .await
    }

    /// Fetch a node and its services. Consul answers `null` for unknown nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn node(&self, name: &str, opts: &QueryOptions) -> Result<Option<CatalogNode>> {
        let path = format!("v1/catalog/node/{name}");
        let node: Option<CatalogNode> = self
            .client
            .send_json::<(), _>(Method::GET, &path, None, &opts.to_pairs(), opts.token())
            .await?;
        Ok(node.filter(|n| n.node.is_some()))
    }

    /// List the instances of a service, optionally filtered by tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn service(&self, name: &str, tag: &str, opts: &QueryOptions) -> Result<Vec<CatalogService>> {
        let path = format!("v1/catalog/service/{name}");
        let mut params = opts.to_pairs();
        if !tag.is_empty() {
            params.push(("tag", tag.to_string()));
        }
        let services: Option<Vec<CatalogService>> = self
            .client
            .send_json::<(), _>(Method::GET, &path, None, &params, opts.token())
            .await?;
        Ok(services.unwrap_or_default())
    }

    /// List every service name with the union of its tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn services(&self, opts: &QueryOptions) -> Result<BTreeMap<String, Vec<String>>> {
        let services: Option<BTreeMap<String, Option<Vec<String>>>> = self
            .client
            .send_json::<(), _>(Method::GET, "v1/catalog/services", None, &opts.to_pairs(), opts.token())
            .await?;
        Ok(services
            .unwrap_or_default()
            .into_iter()
            .map(|(name, tags)| (name, tags.unwrap_or_default()))
            .collect())
    }

    /// List nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn nodes(&self, opts: &QueryOptions) -> Result<Vec<Node>> {
        let nodes: Option<Vec<Node>> = self
            .client
            .send_json::<(), _>(Method::GET, "v1/catalog/nodes", None, &opts.to_pairs(), opts.token())
            .await?;
        Ok(nodes.unwrap_or_default())
    }

    /// List known datacenters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn datacenters(&self) -> Result<Vec<String>> {
        self.client
            .send_json::<(), _>(Method::GET, "v1/catalog/datacenters", None, &[], None)
            .await
    }
}
