//! `consulclient_catalog_service`: instances of one service in the catalog.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, Result};
use crate::helpers::{connect, get_query_opts, query_options_schema, QUERY_OPTIONS};
use crate::provider::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::CatalogService;
use consulclient_api::ConsulApi;
use serde_json::{json, Value};

/// The `consulclient_catalog_service` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogServiceDataSource;

fn service_schema() -> ResourceSchema {
    let mut block = ResourceSchema::new();
    for name in [
        "address",
        "create_index",
        "enable_tag_override",
        "id",
        "modify_index",
        "name",
        "node_address",
        "node_id",
        "node_name",
        "port",
    ] {
        block.insert(name, Schema::string().computed());
    }
    block.insert("node_meta", Schema::map().computed());
    block.insert("tagged_addresses", Schema::map().computed());
    block.insert(
        "tags",
        Schema::list(Elem::Primitive(AttributeType::String)).computed(),
    );
    block
}

/// One element of the `service` list. Numbers and flags are rendered as
/// strings, and an empty service address falls back to the node address.
fn service_to_value(service: CatalogService) -> Value {
    let address = if service.service_address.is_empty() {
        service.address.clone()
    } else {
        service.service_address
    };
    let mut tags = service.service_tags.unwrap_or_default();
    tags.sort();

    json!({
        "create_index": service.create_index.to_string(),
        "modify_index": service.modify_index.to_string(),
        "node_address": service.address,
        "node_id": service.id,
        "node_meta": service.node_meta.unwrap_or_default(),
        "node_name": service.node,
        "address": address,
        "enable_tag_override": service.service_enable_tag_override.to_string(),
        "id": service.service_id,
        "name": service.service_name,
        "port": service.service_port.to_string(),
        "tags": tags,
        "tagged_addresses": service.tagged_addresses.unwrap_or_default(),
    })
}

#[async_trait]
impl DataSource for CatalogServiceDataSource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("name", Schema::string().required());
        schema.insert("tag", Schema::string().optional().computed().force_new());
        schema.insert(QUERY_OPTIONS, query_options_schema());
        schema.insert(
            "service",
            Schema::list(Elem::Block(service_schema())).computed(),
        );
        schema
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let opts = get_query_opts(d, &client).await?;
        let dc = opts.datacenter.clone().unwrap_or_default();
        let name = d.get_str("name").to_string();
        let tag = d.get_str("tag").to_string();

        let services = client
            .catalog()
            .service(&name, &tag, &opts)
            .await
            .context(|| format!("Failed to read Consul catalog service '{name}' in {dc}"))?;

        let list: Vec<Value> = services.into_iter().map(service_to_value).collect();
        d.set_id(format!("catalog-service-{dc}-{name:?}-{tag:?}"));
        d.set("datacenter", dc);
        d.set("name", name);
        d.set("tag", tag);
        d.set("service", list);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{data, meta_for};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn service_address_falls_back_to_node() {
        let value = service_to_value(CatalogService {
            address: "10.0.0.5".into(),
            service_tags: Some(vec!["b".into(), "a".into()]),
            service_port: 80,
            create_index: 12,
            ..CatalogService::default()
        });
        assert_eq!(value["address"], "10.0.0.5");
        assert_eq!(value["port"], "80");
        assert_eq!(value["create_index"], "12");
        assert_eq!(value["enable_tag_override"], "false");
        assert_eq!(value["tags"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn read_lists_instances_with_tag_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/service/web"))
            .and(query_param("tag", "prod"))
            .and(query_param("dc", "dc1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "ID": "node-uuid",
                "Node": "web-1",
                "Address": "10.0.0.5",
                "Datacenter": "dc1",
                "ServiceID": "web-1a",
                "ServiceName": "web",
                "ServiceAddress": "10.0.1.5",
                "ServiceTags": ["prod"],
                "ServicePort": 8080
            }])))
            .mount(&server)
            .await;

        let mut d = data(json!({"name": "web", "tag": "prod", "datacenter": "dc1"}));
        CatalogServiceDataSource
            .read(&meta_for(&server), &mut d)
            .await
            .unwrap();

        assert_eq!(d.id(), "catalog-service-dc1-\"web\"-\"prod\"");
        let services = d.get_list("service");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0]["address"], "10.0.1.5");
        assert_eq!(services[0]["node_address"], "10.0.0.5");
        assert_eq!(services[0]["port"], "8080");
    }
}
