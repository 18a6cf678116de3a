//! `consulclient_catalog_nodes`: every node in a datacenter.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, Result};
use crate::helpers::{connect, get_query_opts, query_options_schema, QUERY_OPTIONS};
use crate::provider::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::Node;
use consulclient_api::ConsulApi;
use serde_json::{json, Value};

/// The `consulclient_catalog_nodes` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogNodesDataSource;

fn node_schema() -> ResourceSchema {
    let mut block = ResourceSchema::new();
    block.insert("id", Schema::string().computed());
    block.insert("name", Schema::string().computed());
    block.insert("address", Schema::string().computed());
    block.insert("meta", Schema::map().computed());
    block.insert("tagged_addresses", Schema::map().computed());
    block
}

fn node_to_value(node: &Node) -> Value {
    json!({
        "id": node.id,
        "name": node.node,
        "address": node.address,
        "meta": node.meta.clone().unwrap_or_default(),
        "tagged_addresses": node.tagged_addresses.clone().unwrap_or_default(),
    })
}

#[async_trait]
impl DataSource for CatalogNodesDataSource {
    fn schema(&self) -> ResourceSchema {
        let strings = || Schema::list(Elem::Primitive(AttributeType::String)).computed();

        let mut schema = connection_attributes();
        schema.insert(QUERY_OPTIONS, query_options_schema());
        schema.insert("nodes", Schema::list(Elem::Block(node_schema())).computed());
        schema.insert("node_ids", strings());
        schema.insert("node_names", strings());
        schema
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let opts = get_query_opts(d, &client).await?;
        let dc = opts.datacenter.clone().unwrap_or_default();

        let nodes = client
            .catalog()
            .nodes(&opts)
            .await
            .context(|| format!("Failed to list Consul catalog nodes in {dc}"))?;

        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let names: Vec<&str> = nodes.iter().map(|n| n.node.as_str()).collect();
        let list: Vec<Value> = nodes.iter().map(node_to_value).collect();

        d.set("node_ids", ids);
        d.set("node_names", names);
        d.set("nodes", list);
        d.set_id(format!("catalog-nodes-{dc}"));
        d.set("datacenter", dc);
        Ok(())
    }
}
