//! Resource and data source traits and the provider registry.

use crate::config::{provider_schema, ProviderConfig};
use crate::data_sources;
use crate::error::{ProviderError, Result};
use crate::resource_data::ResourceData;
use crate::resources;
use crate::schema::{apply_defaults, validate, ResourceSchema};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A managed resource type.
///
/// Every callback receives the provider configuration and the instance's
/// attributes. Callbacks report a vanished resource by clearing the ID.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Attribute schema.
    fn schema(&self) -> ResourceSchema;

    /// Create the resource and set its ID.
    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()>;

    /// Refresh attributes from Consul.
    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()>;

    /// Apply changed attributes. `d` carries the prior state.
    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()>;

    /// Remove the resource.
    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()>;
}

/// A read-only data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Attribute schema.
    fn schema(&self) -> ResourceSchema;

    /// Populate computed attributes and set an ID.
    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()>;
}

/// Full schema of the provider, as dumped by the `schema` operation.
#[derive(Debug, Serialize)]
pub struct ProviderSchema {
    /// Provider block.
    pub provider: ResourceSchema,
    /// Resources by type name.
    pub resources: BTreeMap<&'static str, ResourceSchema>,
    /// Data sources by type name.
    pub data_sources: BTreeMap<&'static str, ResourceSchema>,
}

/// Registry of every resource and data source type.
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::decode(
            what,
            format!("expected an object, got {other}"),
        )),
    }
}

fn prepare(schema: &ResourceSchema, value: Value, what: &str) -> Result<Map<String, Value>> {
    let mut values = into_object(value, what)?;
    apply_defaults(schema, &mut values, &|_: &str| None);
    validate(schema, &values)?;
    Ok(values)
}

impl Provider {
    /// The `consulclient` provider with all its types registered.
    #[must_use]
    pub fn new() -> Self {
        let mut resource_map: BTreeMap<&'static str, Box<dyn Resource>> = BTreeMap::new();
        resource_map.insert("consulclient_acl", Box::new(resources::acl::AclResource));
        resource_map.insert(
            "consulclient_agent_service",
            Box::new(resources::agent_service::AgentServiceResource),
        );
        resource_map.insert(
            "consulclient_catalog_entry",
            Box::new(resources::catalog_entry::CatalogEntryResource),
        );
        resource_map.insert("consulclient_keys", Box::new(resources::keys::KeysResource));
        resource_map.insert(
            "consulclient_key_prefix",
            Box::new(resources::key_prefix::KeyPrefixResource),
        );
        resource_map.insert("consulclient_node", Box::new(resources::node::NodeResource));
        resource_map.insert(
            "consulclient_prepared_query",
            Box::new(resources::prepared_query::PreparedQueryResource),
        );
        resource_map.insert(
            "consulclient_service",
            Box::new(resources::service::ServiceResource),
        );

        let mut data_source_map: BTreeMap<&'static str, Box<dyn DataSource>> = BTreeMap::new();
        data_source_map.insert(
            "consulclient_agent_self",
            Box::new(data_sources::agent_self::AgentSelfDataSource),
        );
        data_source_map.insert(
            "consulclient_catalog_nodes",
            Box::new(data_sources::catalog_nodes::CatalogNodesDataSource),
        );
        data_source_map.insert(
            "consulclient_catalog_service",
            Box::new(data_sources::catalog_service::CatalogServiceDataSource),
        );
        data_source_map.insert(
            "consulclient_catalog_services",
            Box::new(data_sources::catalog_services::CatalogServicesDataSource),
        );
        data_source_map.insert(
            "consulclient_keys",
            Box::new(data_sources::keys::KeysDataSource),
        );

        Self {
            resources: resource_map,
            data_sources: data_source_map,
        }
    }

    /// Registered resource type names.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    /// Registered data source type names.
    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    /// Look up a resource type.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownType`] for unregistered names.
    pub fn resource(&self, type_name: &str) -> Result<&dyn Resource> {
        self.resources
            .get(type_name)
            .map(|r| &**r)
            .ok_or_else(|| ProviderError::UnknownType {
                kind: "resource",
                name: type_name.to_string(),
            })
    }

    /// Look up a data source type.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownType`] for unregistered names.
    pub fn data_source(&self, type_name: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .get(type_name)
            .map(|r| &**r)
            .ok_or_else(|| ProviderError::UnknownType {
                kind: "data source",
                name: type_name.to_string(),
            })
    }

    /// Schema of the provider and every registered type.
    #[must_use]
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: provider_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (*name, r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, ds)| (*name, ds.schema()))
                .collect(),
        }
    }

    /// Decode the provider block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is malformed.
    pub fn configure<F>(&self, raw: Value, lookup: F) -> Result<ProviderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = into_object(raw, "provider")?;
        validate(&provider_schema(), &raw)?;
        let config = ProviderConfig::from_attributes(raw, lookup)?;
        info!(
            host = %config.host,
            scheme = %config.scheme,
            datacenter = %config.datacenter,
            "Provider configured"
        );
        Ok(config)
    }

    /// Create a resource from its planned attributes and return the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes are invalid or the resource's
    /// create callback fails.
    pub async fn create(&self, meta: &ProviderConfig, type_name: &str, planned: Value) -> Result<Value> {
        let resource = self.resource(type_name)?;
        let values = prepare(&resource.schema(), planned, type_name)?;
        let mut d = ResourceData::new(values);
        debug!(type_name, "create");
        resource.create(meta, &mut d).await?;
        Ok(d.to_value())
    }

    /// Refresh a resource's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is malformed or the read callback fails.
    pub async fn read(&self, meta: &ProviderConfig, type_name: &str, state: Value) -> Result<Value> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::new(into_object(state, type_name)?);
        debug!(type_name, id = d.id(), "read");
        resource.read(meta, &mut d).await?;
        Ok(d.to_value())
    }

    /// Apply planned attributes over the prior state.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes are invalid or the update callback
    /// fails.
    pub async fn update(
        &self,
        meta: &ProviderConfig,
        type_name: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value> {
        let resource = self.resource(type_name)?;
        let prior = into_object(prior, type_name)?;
        let mut values = prepare(&resource.schema(), planned, type_name)?;
        if !values.contains_key("id") {
            if let Some(id) = prior.get("id") {
                values.insert("id".to_string(), id.clone());
            }
        }
        let mut d = ResourceData::with_prior(values, prior);
        debug!(type_name, id = d.id(), "update");
        resource.update(meta, &mut d).await?;
        Ok(d.to_value())
    }

    /// Remove a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is malformed or the delete callback
    /// fails.
    pub async fn delete(&self, meta: &ProviderConfig, type_name: &str, state: Value) -> Result<()> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::new(into_object(state, type_name)?);
        debug!(type_name, id = d.id(), "delete");
        resource.delete(meta, &mut d).await
    }

    /// Read a data source.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes are invalid or the read fails.
    pub async fn read_data_source(
        &self,
        meta: &ProviderConfig,
        type_name: &str,
        config: Value,
    ) -> Result<Value> {
        let data_source = self.data_source(type_name)?;
        let values = prepare(&data_source.schema(), config, type_name)?;
        let mut d = ResourceData::new(values);
        debug!(type_name, "read data source");
        data_source.read(meta, &mut d).await?;
        Ok(d.to_value())
    }
}
