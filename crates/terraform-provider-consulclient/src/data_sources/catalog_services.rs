//! `consulclient_catalog_services`: every service name in a datacenter.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, Result};
use crate::helpers::{connect, get_query_opts, query_options_schema, QUERY_OPTIONS};
use crate::provider::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::ConsulApi;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The `consulclient_catalog_services` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogServicesDataSource;

/// `services` map: name to its tags, sorted and joined by spaces.
fn tag_map(services: &BTreeMap<String, Vec<String>>) -> Map<String, Value> {
    services
        .iter()
        .map(|(name, tags)| {
            let mut tags = tags.clone();
            tags.sort();
            (name.clone(), Value::String(tags.join(" ")))
        })
        .collect()
}

#[async_trait]
impl DataSource for CatalogServicesDataSource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert(QUERY_OPTIONS, query_options_schema());
        schema.insert(
            "names",
            Schema::list(Elem::Primitive(AttributeType::String)).computed(),
        );
        schema.insert("services", Schema::map().computed());
        schema
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let opts = get_query_opts(d, &client).await?;
        let dc = opts.datacenter.clone().unwrap_or_default();

        let services = client
            .catalog()
            .services(&opts)
            .await
            .context(|| format!("Failed to list Consul catalog services in {dc}"))?;

        let names: Vec<String> = services.keys().cloned().collect();
        d.set_id(format!("catalog-services-{dc}"));
        d.set("datacenter", dc);
        d.set("names", names);
        d.set("services", tag_map(&services));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{data, meta_for};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn names_are_sorted_and_tags_joined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": ["v2", "prod"],
                "consul": [],
                "db": null
            })))
            .mount(&server)
            .await;

        let mut d = data(json!({"datacenter": "dc1"}));
        CatalogServicesDataSource
            .read(&meta_for(&server), &mut d)
            .await
            .unwrap();

        assert_eq!(d.id(), "catalog-services-dc1");
        assert_eq!(d.get("names"), Some(&json!(["consul", "db", "web"])));
        let services = d.get_map("services");
        assert_eq!(services.get("web").map(String::as_str), Some("prod v2"));
        assert_eq!(services.get("db").map(String::as_str), Some(""));
    }
}
