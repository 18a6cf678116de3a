//! `consulclient_catalog_entry`: a node plus the services registered on it.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, ProviderError, Result};
use crate::hashing::{catalog_entry_id, hash_service, ServiceKey};
use crate::helpers::{connect, get_dc};
use crate::provider::Resource;
use crate::resource_data::{string_set, ResourceData};
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::{AgentService, CatalogDeregistration, CatalogRegistration};
use consulclient_api::ConsulApi;
use consulclient_core::{QueryOptions, WriteOptions};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// The `consulclient_catalog_entry` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogEntryResource;

/// One element of the `service` set, with its ID defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServiceBlock {
    id: String,
    name: String,
    address: String,
    port: u16,
    tags: Vec<String>,
}

impl ServiceBlock {
    fn from_block(block: &Map<String, Value>) -> Result<Self> {
        let text = |key: &str| {
            block
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let name = text("name");
        if name.is_empty() {
            return Err(ProviderError::decode("service.name", "must not be empty"));
        }
        let id = Some(text("id")).filter(|id| !id.is_empty()).unwrap_or_else(|| name.clone());

        let raw_port = block.get("port").and_then(Value::as_i64).unwrap_or_default();
        let port = u16::try_from(raw_port).map_err(|_| {
            ProviderError::decode("service.port", format!("{raw_port} is not a valid port"))
        })?;

        let tags = block
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| string_set(tags))
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            address: text("address"),
            port,
            tags,
        })
    }

    fn hash(&self) -> u64 {
        hash_service(&ServiceKey {
            id: &self.id,
            name: &self.name,
            address: &self.address,
            port: i64::from(self.port),
            tags: self.tags.iter().map(String::as_str).collect(),
        })
    }

    fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "address": self.address,
            "port": self.port,
            "tags": self.tags,
        })
    }
}

/// Services of the resource, deduplicated by set hash and ordered by it.
fn services(d: &ResourceData) -> Result<Vec<ServiceBlock>> {
    let mut services = d
        .get_list("service")
        .iter()
        .filter_map(Value::as_object)
        .map(ServiceBlock::from_block)
        .collect::<Result<Vec<_>>>()?;
    services.sort_by_key(ServiceBlock::hash);
    services.dedup_by_key(|s| s.hash());
    Ok(services)
}

fn service_schema() -> ResourceSchema {
    let mut block = ResourceSchema::new();
    block.insert("address", Schema::string().optional().force_new());
    block.insert("id", Schema::string().optional().computed().force_new());
    block.insert("name", Schema::string().required().force_new());
    block.insert("port", Schema::int().optional().force_new());
    block.insert(
        "tags",
        Schema::set(Elem::Primitive(AttributeType::String))
            .optional()
            .force_new(),
    );
    block
}

#[async_trait]
impl Resource for CatalogEntryResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("address", Schema::string().required().force_new());
        schema.insert("node", Schema::string().required().force_new());
        schema.insert(
            "service",
            Schema::set(Elem::Block(service_schema()))
                .optional()
                .force_new(),
        );
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let w_opts = WriteOptions::new(&dc, d.get_str("token"));
        let address = d.get_str("address").to_string();
        let node = d.get_str("node").to_string();
        let services = services(d)?;

        let base = CatalogRegistration {
            node: node.clone(),
            address: address.clone(),
            datacenter: Some(dc.clone()),
            ..CatalogRegistration::default()
        };
        let registrations: Vec<CatalogRegistration> = if services.is_empty() {
            vec![base]
        } else {
            services
                .iter()
                .map(|service| CatalogRegistration {
                    service: Some(AgentService {
                        id: service.id.clone(),
                        service: service.name.clone(),
                        address: service.address.clone(),
                        port: service.port,
                        tags: (!service.tags.is_empty()).then(|| service.tags.clone()),
                        ..AgentService::default()
                    }),
                    ..base.clone()
                })
                .collect()
        };

        for registration in &registrations {
            debug!(
                node = %node,
                service = registration.service.as_ref().map(|s| s.id.as_str()),
                dc = %dc,
                "Registering catalog entry"
            );
            client
                .catalog()
                .register(registration, &w_opts)
                .await
                .context(|| {
                    format!(
                        "Failed to register Consul catalog entry with node '{node}' at address '{address}' in {dc}"
                    )
                })?;
        }

        client
            .catalog()
            .node(&node, &QueryOptions::new(&dc, ""))
            .await
            .context(|| {
                format!(
                    "Failed to read Consul catalog entry for node '{node}' at address '{address}' in {dc}"
                )
            })?;

        let service_ids: Vec<String> = services.iter().map(|s| s.id.clone()).collect();
        d.set("datacenter", dc);
        if !services.is_empty() {
            d.set(
                "service",
                Value::Array(services.iter().map(ServiceBlock::to_value).collect()),
            );
        }
        d.set_id(catalog_entry_id(&node, &address, &service_ids));
        Ok(())
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let dc = d.get_str("datacenter").to_string();
        let node = d.get_str("node").to_string();

        let found = client
            .catalog()
            .node(&node, &QueryOptions::new(&dc, ""))
            .await
            .context(|| format!("Failed to get node '{node}' from Consul catalog"))?;
        if found.is_none() {
            warn!(node = %node, dc = %dc, "Catalog entry no longer registered, removing from state");
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
        let node = d.get_str("node").to_string();

        let deregistration = CatalogDeregistration {
            node: node.clone(),
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
                    "Failed to deregister Consul catalog entry with node '{node}' at address '{address}' in {dc}"
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
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn service_id_defaults_to_name() {
        let d = data(json!({"service": [{"name": "web", "port": 80, "tags": ["b", "a"]}]}));
        let services = services(&d).unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id, "web");
        assert_eq!(services[0].tags, vec!["a", "b"]);
    }

    #[test]
    fn duplicate_services_collapse() {
        let d = data(json!({"service": [
            {"name": "web", "tags": ["a", "b"]},
            {"name": "web", "tags": ["b", "a"]}
        ]}));
        assert_eq!(services(&d).unwrap().len(), 1);
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let d = data(json!({"service": [{"name": "web", "port": 70000}]}));
        assert!(matches!(services(&d), Err(ProviderError::Decode { .. })));
    }

    #[tokio::test]
    async fn read_clears_id_when_node_is_gone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/host-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .expect(1)
            .mount(&server)
            .await;

        let mut d = data(json!({
            "id": "host-1-10.1.0.1-[web]",
            "node": "host-1",
            "address": "10.1.0.1",
            "datacenter": "dc1"
        }));
        CatalogEntryResource
            .read(&meta_for(&server), &mut d)
            .await
            .unwrap();
        assert_eq!(d.id(), "");
    }

    #[tokio::test]
    async fn read_keeps_id_while_node_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/host-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Node": {"Node": "host-1", "Address": "10.1.0.1", "Datacenter": "dc1"},
                "Services": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut d = data(json!({
            "id": "host-1-10.1.0.1-[web]",
            "node": "host-1",
            "address": "10.1.0.1",
            "datacenter": "dc1"
        }));
        CatalogEntryResource
            .read(&meta_for(&server), &mut d)
            .await
            .unwrap();
        assert_eq!(d.id(), "host-1-10.1.0.1-[web]");
    }

    #[tokio::test]
    async fn create_registers_each_service() {
        let server = MockServer::start().await;
        for id in ["api", "web-main"] {
            Mock::given(method("PUT"))
                .and(path("/v1/catalog/register"))
                .and(body_partial_json(json!({"Node": "host-1", "Service": {"ID": id}})))
                .respond_with(ResponseTemplate::new(200).set_body_string("true"))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/host-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Node": {"Node": "host-1", "Address": "10.1.0.1"}
            })))
            .mount(&server)
            .await;

        let mut d = data(json!({
            "node": "host-1",
            "address": "10.1.0.1",
            "datacenter": "dc1",
            "service": [
                {"name": "web", "id": "web-main", "port": 80},
                {"name": "api", "port": 8080, "tags": ["v1"]}
            ]
        }));
        CatalogEntryResource
            .create(&meta_for(&server), &mut d)
            .await
            .unwrap();

        assert_eq!(d.id(), "host-1-10.1.0.1-[api,web-main]");
        let ids: Vec<&str> = d
            .get_list("service")
            .iter()
            .filter_map(|s| s["id"].as_str())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"api"));
    }

    #[tokio::test]
    async fn create_without_services_registers_node_only() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/catalog/register"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/node/host-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Node": {"Node": "host-2", "Address": "10.1.0.2"}
            })))
            .mount(&server)
            .await;

        let mut d = data(json!({"node": "host-2", "address": "10.1.0.2", "datacenter": "dc1"}));
        CatalogEntryResource
            .create(&meta_for(&server), &mut d)
            .await
            .unwrap();
        assert_eq!(d.id(), "host-2-10.1.0.2-[]");
    }

    #[tokio::test]
    async fn delete_deregisters_node() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/catalog/deregister"))
            .and(body_partial_json(json!({"Node": "host-1", "Address": "10.1.0.1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let mut d = data(json!({
            "id": "host-1-10.1.0.1-[]", "node": "host-1", "address": "10.1.0.1", "datacenter": "dc1"
        }));
        CatalogEntryResource
            .delete(&meta_for(&server), &mut d)
            .await
            .unwrap();
        assert_eq!(d.id(), "");
    }
}
