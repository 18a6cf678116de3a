//! Datacenter and query-option resolution shared by resources and data sources.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, ProviderError, Result};
use crate::resource_data::{string_map, ResourceData};
use crate::schema::{Elem, ResourceSchema, Schema};
use consulclient_api::ConsulApi;
use consulclient_core::{ConsulClient, QueryOptions};
use serde_json::{Map, Value};
use std::time::Duration;

/// Attribute holding the read options block of data sources.
pub const QUERY_OPTIONS: &str = "query_options";

/// Client for one operation, built from the provider settings with the
/// instance's connection attributes layered on top.
///
/// # Errors
///
/// Returns an error if the resolved settings are invalid.
pub fn connect(meta: &ProviderConfig, d: &ResourceData) -> Result<(ConsulClient, ProviderConfig)> {
    let resolved = meta.get_resolved_config(d);
    let client = resolved.new_client()?;
    Ok((client, resolved))
}

/// Datacenter of an operation: the `datacenter` attribute when set, then the
/// client's configured datacenter, else the datacenter of the agent the
/// client talks to.
///
/// # Errors
///
/// Returns an error if the agent cannot be asked.
pub async fn get_dc(d: &ResourceData, client: &ConsulClient) -> Result<String> {
    if let Some(dc) = d.get_ok_str("datacenter") {
        return Ok(dc.to_string());
    }
    if let Some(dc) = client.datacenter() {
        return Ok(dc.to_string());
    }
    client
        .agent()
        .datacenter()
        .await
        .context(|| "Failed to get datacenter from Consul agent".to_string())
}

/// Schema of the `query_options` block.
#[must_use]
pub fn query_options_schema() -> Schema {
    let mut block = ResourceSchema::new();
    block.insert("allow_stale", Schema::bool().optional().default_value(true));
    block.insert("datacenter", Schema::string().optional());
    block.insert("near", Schema::string().optional());
    block.insert("node_meta", Schema::map().optional());
    block.insert(
        "require_consistent",
        Schema::bool().optional().default_value(false),
    );
    block.insert("token", Schema::string().optional());
    block.insert("wait_index", Schema::int().optional());
    block.insert("wait_time", Schema::string().optional());
    Schema::set(Elem::Block(block)).optional()
}

/// Parse a duration such as `500ms`, `10s`, `5m` or `1h`. A bare number is
/// seconds.
///
/// # Errors
///
/// Returns a message describing the malformed input.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let trimmed = input.trim();
    let (number, unit_ms) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = trimmed.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (trimmed, 1_000)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{input}'"))?;
    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{input}' is too large"))
}

fn apply_block(opts: &mut QueryOptions, block: &Map<String, Value>) -> Result<()> {
    let text = |key: &str| {
        block
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(stale) = block.get("allow_stale").and_then(Value::as_bool) {
        opts.allow_stale = stale;
    }
    if let Some(consistent) = block.get("require_consistent").and_then(Value::as_bool) {
        opts.require_consistent = consistent;
    }
    if let Some(dc) = text("datacenter") {
        opts.datacenter = Some(dc);
    }
    if let Some(near) = text("near") {
        opts.near = Some(near);
    }
    if let Some(token) = text("token") {
        opts.token = Some(token);
    }
    opts.node_meta.extend(string_map(block.get("node_meta")));

    match block.get("wait_index").and_then(Value::as_i64) {
        Some(index) if index < 0 => {
            return Err(ProviderError::decode(
                "query_options.wait_index",
                "must be zero or greater",
            ));
        }
        Some(index) if index > 0 => opts.wait_index = u64::try_from(index).ok(),
        _ => {}
    }
    if let Some(wait) = text("wait_time") {
        let duration = parse_duration(&wait)
            .map_err(|message| ProviderError::decode("query_options.wait_time", message))?;
        opts.wait_time = Some(duration);
    }
    Ok(())
}

/// Read options for a data source, from its `query_options` block. Without
/// an explicit datacenter the one from [`get_dc`] is used.
///
/// # Errors
///
/// Returns an error if the block is malformed or the datacenter cannot be
/// determined.
pub async fn get_query_opts(d: &ResourceData, client: &ConsulClient) -> Result<QueryOptions> {
    let mut opts = QueryOptions::default();
    for block in d.get_list(QUERY_OPTIONS).iter().filter_map(Value::as_object) {
        apply_block(&mut opts, block)?;
    }

    if opts.datacenter.is_none() {
        opts.datacenter = Some(get_dc(d, client).await?);
    }
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn agent_in(dc: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/self"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Config": {"Datacenter": dc}})),
            )
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn durations_parse_with_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("soon").is_err());
    }

    #[tokio::test]
    async fn explicit_datacenter_skips_agent() {
        let server = MockServer::start().await;
        let client = ConsulClient::new(server.uri()).unwrap();
        let d = ResourceData::from_value(json!({"datacenter": "dc9"})).unwrap();
        assert_eq!(get_dc(&d, &client).await.unwrap(), "dc9");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn configured_datacenter_beats_agent() {
        let server = agent_in("east").await;
        let meta = ProviderConfig {
            host: server.address().to_string(),
            datacenter: "dc1".into(),
            ..ProviderConfig::default()
        };
        let d = ResourceData::default();
        let (client, resolved) = connect(&meta, &d).unwrap();
        assert_eq!(resolved.datacenter, "dc1");
        assert_eq!(get_dc(&d, &client).await.unwrap(), "dc1");
    }

    #[tokio::test]
    async fn datacenter_falls_back_to_agent() {
        let server = agent_in("east").await;
        let client = ConsulClient::new(server.uri()).unwrap();
        let d = ResourceData::default();
        assert_eq!(get_dc(&d, &client).await.unwrap(), "east");
    }

    #[tokio::test]
    async fn query_options_block_is_applied() {
        let server = agent_in("east").await;
        let client = ConsulClient::new(server.uri()).unwrap();
        let d = ResourceData::from_value(json!({
            "query_options": [{
                "allow_stale": false,
                "require_consistent": true,
                "near": "_agent",
                "node_meta": {"rack": "r1"},
                "wait_index": 42,
                "wait_time": "1m"
            }]
        }))
        .unwrap();

        let opts = get_query_opts(&d, &client).await.unwrap();
        assert!(!opts.allow_stale);
        assert!(opts.require_consistent);
        assert_eq!(opts.near.as_deref(), Some("_agent"));
        assert_eq!(opts.node_meta.get("rack").map(String::as_str), Some("r1"));
        assert_eq!(opts.wait_index, Some(42));
        assert_eq!(opts.wait_time, Some(Duration::from_secs(60)));
        assert_eq!(opts.datacenter.as_deref(), Some("east"));
    }

    #[tokio::test]
    async fn block_datacenter_wins() {
        let server = MockServer::start().await;
        let client = ConsulClient::new(server.uri()).unwrap();
        let d = ResourceData::from_value(json!({"query_options": [{"datacenter": "west"}]})).unwrap();
        let opts = get_query_opts(&d, &client).await.unwrap();
        assert_eq!(opts.datacenter.as_deref(), Some("west"));
    }

    #[tokio::test]
    async fn negative_wait_index_is_rejected() {
        let server = MockServer::start().await;
        let client = ConsulClient::new(server.uri()).unwrap();
        let d = ResourceData::from_value(json!({"query_options": [{"wait_index": -1, "datacenter": "x"}]}))
            .unwrap();
        assert!(get_query_opts(&d, &client).await.is_err());
    }
}
