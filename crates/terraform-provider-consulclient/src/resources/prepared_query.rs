//! `consulclient_prepared_query`: a stored service query.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, ProviderError, Result};
use crate::helpers::{connect, get_dc};
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::{
    PreparedQueryDefinition, QueryDatacenterOptions, QueryDnsOptions, QueryTemplate, ServiceQuery,
};
use consulclient_api::ConsulApi;
use consulclient_core::uuid::{QueryId, SessionId};
use consulclient_core::{QueryOptions, WriteOptions};
use serde_json::{json, Map, Value};
use tracing::warn;

/// The `consulclient_prepared_query` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreparedQueryResource;

fn block_str<'a>(block: Option<&'a Map<String, Value>>, key: &str) -> &'a str {
    block
        .and_then(|b| b.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn query_id(d: &ResourceData) -> Result<QueryId> {
    QueryId::parse_str(d.id()).map_err(|e| ProviderError::decode("id", e.to_string()))
}

fn definition(d: &ResourceData) -> Result<PreparedQueryDefinition> {
    let session = match d.get_ok_str("session") {
        Some(raw) => Some(
            SessionId::parse_str(raw).map_err(|e| ProviderError::decode("session", e.to_string()))?,
        ),
        None => None,
    };

    let failover = d.get_block("failover");
    let nearest_n = failover
        .and_then(|b| b.get("nearest_n"))
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let nearest_n = u32::try_from(nearest_n).map_err(|_| {
        ProviderError::decode("failover.nearest_n", "must be zero or greater")
    })?;
    let datacenters = failover
        .and_then(|b| b.get("datacenters"))
        .and_then(Value::as_array)
        .map(|dcs| {
            dcs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let dns = d.get_block("dns");
    let template = d.get_block("template");

    Ok(PreparedQueryDefinition {
        id: None,
        name: d.get_str("name").to_string(),
        session,
        token: d.get_str("stored_token").to_string(),
        service: ServiceQuery {
            service: d.get_str("service").to_string(),
            failover: QueryDatacenterOptions {
                nearest_n,
                datacenters,
            },
            only_passing: d.get_bool("only_passing"),
            near: d.get_str("near").to_string(),
            tags: d.get_string_set("tags"),
        },
        dns: QueryDnsOptions {
            ttl: block_str(dns, "ttl").to_string(),
        },
        template: QueryTemplate {
            r#type: block_str(template, "type").to_string(),
            regexp: block_str(template, "regexp").to_string(),
        },
    })
}

fn write_back(d: &mut ResourceData, query: PreparedQueryDefinition) {
    let ServiceQuery {
        service,
        failover,
        only_passing,
        near,
        mut tags,
    } = query.service;
    tags.sort();
    tags.dedup();

    d.set("name", query.name);
    d.set("service", service);
    d.set("stored_token", query.token);
    d.set("only_passing", only_passing);
    d.set("near", near);
    d.set("tags", tags);
    d.set(
        "session",
        query.session.map(|s| s.to_string()).unwrap_or_default(),
    );

    let failover = if failover.nearest_n > 0 || !failover.datacenters.is_empty() {
        json!([{"nearest_n": failover.nearest_n, "datacenters": failover.datacenters}])
    } else {
        json!([])
    };
    d.set("failover", failover);

    let dns = if query.dns.ttl.is_empty() {
        json!([])
    } else {
        json!([{"ttl": query.dns.ttl}])
    };
    d.set("dns", dns);

    let template = if query.template.r#type.is_empty() {
        json!([])
    } else {
        json!([{"type": query.template.r#type, "regexp": query.template.regexp}])
    };
    d.set("template", template);
}

fn single_block(fields: ResourceSchema) -> Schema {
    Schema::list(Elem::Block(fields)).optional().max_items(1)
}

#[async_trait]
impl Resource for PreparedQueryResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("name", Schema::string().required());
        schema.insert("session", Schema::string().optional());
        schema.insert("stored_token", Schema::string().optional());
        schema.insert("service", Schema::string().required());
        schema.insert(
            "tags",
            Schema::set(Elem::Primitive(AttributeType::String)).optional(),
        );
        schema.insert("near", Schema::string().optional());
        schema.insert("only_passing", Schema::bool().optional());

        let mut failover = ResourceSchema::new();
        failover.insert("nearest_n", Schema::int().optional());
        failover.insert(
            "datacenters",
            Schema::list(Elem::Primitive(AttributeType::String)).optional(),
        );
        schema.insert("failover", single_block(failover));

        let mut dns = ResourceSchema::new();
        dns.insert("ttl", Schema::string().optional());
        schema.insert("dns", single_block(dns));

        let mut template = ResourceSchema::new();
        template.insert("type", Schema::string().required());
        template.insert("regexp", Schema::string().optional());
        schema.insert("template", single_block(template));
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let query = definition(d)?;

        let id = client
            .prepared_queries()
            .create(&query, &WriteOptions::new(&dc, &resolved.token))
            .await
            .context(|| format!("Failed to create prepared query '{}' in {dc}", query.name))?;

        d.set_id(id.to_string());
        self.read(meta, d).await
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let id = query_id(d)?;

        let found = client
            .prepared_queries()
            .get(&id, &QueryOptions::new(&dc, &resolved.token))
            .await
            .context(|| format!("Failed to read prepared query '{id}' in {dc}"))?;
        let Some(query) = found else {
            warn!(%id, dc = %dc, "Prepared query no longer exists, removing from state");
            d.set_id("");
            return Ok(());
        };

        write_back(d, query);
        d.set("datacenter", dc);
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let id = query_id(d)?;
        let query = PreparedQueryDefinition {
            id: Some(id),
            ..definition(d)?
        };

        client
            .prepared_queries()
            .update(&id, &query, &WriteOptions::new(&dc, &resolved.token))
            .await
            .context(|| format!("Failed to update prepared query '{id}' in {dc}"))?;

        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let id = query_id(d)?;

        client
            .prepared_queries()
            .delete(&id, &WriteOptions::new(&dc, &resolved.token))
            .await
            .context(|| format!("Failed to delete prepared query '{id}' in {dc}"))?;

        d.set_id("");
        Ok(())
    }
}
