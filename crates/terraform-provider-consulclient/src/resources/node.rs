//! `consulclient_node`: a bare node in the catalog.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, Result};
use crate::hashing::node_id;
use crate::helpers::{connect, get_dc};
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::{CatalogDeregistration, CatalogRegistration};
use consulclient_api::ConsulApi;
use consulclient_core::{QueryOptions, WriteOptions};
use tracing::{debug, warn};

/// The `consulclient_node` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeResource;

#[async_trait]
impl Resource for NodeResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("address", Schema::string().required().force_new());
        schema.insert("name", Schema::string().required().force_new());
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let address = d.get_str("address").to_string();
        let name = d.get_str("name").to_string();

        let registration = CatalogRegistration {
            node: name.clone(),
            address: address.clone(),
            datacenter: Some(dc.clone()),
            ..CatalogRegistration::default()
        };
        debug!(node = %name, address = %address, dc = %dc, "Registering node");
        client
            .catalog()
            .register(&registration, &WriteOptions::new(&dc, d.get_str("token")))
            .await
            .context(|| {
                format!(
                    "Failed to register Consul catalog node with name '{name}' at address '{address}' in {dc}"
                )
            })?;

        client
            .catalog()
            .node(&name, &QueryOptions::new(&dc, ""))
            .await
            .context(|| {
                format!(
                    "Failed to read Consul catalog node with name '{name}' at address '{address}' in {dc}"
                )
            })?;

        d.set("datacenter", dc);
        d.set_id(node_id(&name, &address));
        Ok(())
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let dc = d.get_str("datacenter").to_string();
        let name = d.get_str("name").to_string();

        let node = client
            .catalog()
            .node(&name, &QueryOptions::new(&dc, ""))
            .await
            .context(|| format!("Failed to get name '{name}' from Consul catalog"))?;
        if node.is_none() {
            warn!(node = %name, dc = %dc, "Node no longer registered, removing from state");
            d.set_id("");
        }
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        self.create(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let address = d.get_str("address").to_string();
        let name = d.get_str("name").to_string();

        let deregistration = CatalogDeregistration {
            node: name.clone(),
            address: Some(address.clone()),
            datacenter: Some(dc.clone()),
            ..CatalogDeregistration::default()
        };
        client
            .catalog()
            .deregister(&deregistration, &WriteOptions::new(&dc, d.get_str("token")))
            .await
            .context(|| {
                format!(
                    "Failed to deregister Consul catalog node with name '{name}' at address '{address}' in {dc}"
                )
            })?;

        d.set_id("");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{data, meta_for};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_registers_and_builds_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/catalog/register"))
            .and(body_json(json!({"Node": "web-1", "Address": "10.0.0.5", "Datacenter": "dc1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/web-1"))
            .and(query_param("dc", "dc1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Node": {"Node": "web-1", "Address": "10.0.0.5", "Datacenter": "dc1"},
                "Services": {}
            })))
            .mount(&server)
            .await;

        let mut d = data(json!({"name": "web-1", "address": "10.0.0.5", "datacenter": "dc1"}));
        NodeResource.create(&meta_for(&server), &mut d).await.unwrap();
        assert_eq!(d.id(), "web-1-10.0.0.5");
        assert_eq!(d.get_str("datacenter"), "dc1");
    }

    #[tokio::test]
    async fn create_uses_agent_datacenter_when_unset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/self"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Config": {"Datacenter": "east"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/catalog/register"))
            .and(query_param("dc", "east"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Node": {"Node": "db", "Address": "10.0.0.9"}
            })))
            .mount(&server)
            .await;

        let mut d = data(json!({"name": "db", "address": "10.0.0.9"}));
        NodeResource.create(&meta_for(&server), &mut d).await.unwrap();
        assert_eq!(d.get_str("datacenter"), "east");
    }

    #[tokio::test]
    async fn unknown_node_clears_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/web-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let mut d = data(json!({
            "id": "web-1-10.0.0.5", "name": "web-1", "address": "10.0.0.5", "datacenter": "dc1"
        }));
        NodeResource.read(&meta_for(&server), &mut d).await.unwrap();
        assert_eq!(d.id(), "");
    }

    #[tokio::test]
    async fn register_failure_names_the_node() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/catalog/register"))
            .respond_with(ResponseTemplate::new(403).set_body_string("ACL not found"))
            .mount(&server)
            .await;

        let mut d = data(json!({"name": "web-1", "address": "10.0.0.5", "datacenter": "dc1"}));
        let err = NodeResource
            .create(&meta_for(&server), &mut d)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to register Consul catalog node with name 'web-1' at address '10.0.0.5' in dc1"));
        assert_eq!(d.id(), "");
    }
}
