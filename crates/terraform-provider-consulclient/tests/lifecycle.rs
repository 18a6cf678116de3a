//! End-to-end resource lifecycles driven through the public provider API
//! against a mocked Consul agent.

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use terraform_provider_consulclient::{serve, Provider, ProviderConfig};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> Value {
    let fixture_path = fixtures_dir().join(name);
    let raw = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&raw).expect("Fixture should be valid JSON")
}

fn configure(provider: &Provider, server: &MockServer) -> ProviderConfig {
    provider
        .configure(
            json!({
                "host": server.address().to_string(),
                "scheme": "http",
                "datacenter": "dc1",
                "token": "provider-token"
            }),
            |_| None,
        )
        .expect("Provider should configure")
}

#[tokio::test]
async fn node_create_read_delete() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/register"))
        .and(query_param("dc", "dc1"))
        .and(body_json(json!({"Node": "web-1", "Address": "10.0.0.5", "Datacenter": "dc1"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/node/web-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Node": {"Node": "web-1", "Address": "10.0.0.5", "Datacenter": "dc1"},
            "Services": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/deregister"))
        .and(body_json(json!({"Node": "web-1", "Address": "10.0.0.5", "Datacenter": "dc1"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Provider::new();
    let meta = configure(&provider, &server);

    let state = provider
        .create(&meta, "consulclient_node", json!({"name": "web-1", "address": "10.0.0.5"}))
        .await
        .unwrap();
    assert_eq!(state["id"], "web-1-10.0.0.5");
    assert_eq!(state["datacenter"], "dc1");

    let state = provider
        .read(&meta, "consulclient_node", state)
        .await
        .unwrap();
    assert_eq!(state["id"], "web-1-10.0.0.5");

    provider
        .delete(&meta, "consulclient_node", state)
        .await
        .unwrap();
}

#[tokio::test]
async fn acl_lifecycle_uses_provider_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/acl/create"))
        .and(header("X-Consul-Token", "provider-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "acl-9"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/acl/info/acl-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "ID": "acl-9",
            "Name": "ops",
            "Type": "management",
            "Rules": ""
        }])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/acl/update"))
        .and(body_json(json!({
            "ID": "acl-9",
            "Name": "operators",
            "Type": "management",
            "Rules": ""
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/acl/destroy/acl-9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Provider::new();
    let meta = configure(&provider, &server);

    let created = provider
        .create(
            &meta,
            "consulclient_acl",
            json!({"name": "ops", "type": "management", "rules": ""}),
        )
        .await
        .unwrap();
    assert_eq!(created["id"], "acl-9");

    let updated = provider
        .update(
            &meta,
            "consulclient_acl",
            created.clone(),
            json!({"name": "operators", "type": "management", "rules": ""}),
        )
        .await
        .unwrap();
    assert_eq!(updated["id"], "acl-9");

    provider
        .delete(&meta, "consulclient_acl", updated)
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_attributes_are_rejected_before_any_request() {
    let server = MockServer::start().await;
    let provider = Provider::new();
    let meta = configure(&provider, &server);

    let err = provider
        .create(
            &meta,
            "consulclient_node",
            json!({"name": "web-1", "address": "10.0.0.5", "colour": "blue"}),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("colour"), "unexpected error: {err}");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn catalog_service_data_source_renders_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/service/web"))
        .and(query_param("dc", "dc1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("catalog_service_web.json")),
        )
        .mount(&server)
        .await;

    let provider = Provider::new();
    let meta = configure(&provider, &server);
    let state = provider
        .read_data_source(&meta, "consulclient_catalog_service", json!({"name": "web"}))
        .await
        .unwrap();

    let service = &state["service"][0];
    assert_eq!(service["id"], "web-edge-1");
    assert_eq!(service["node_name"], "edge-1");
    assert_eq!(service["address"], "10.1.0.21");
    assert_eq!(service["port"], "443");
    assert_eq!(service["create_index"], "118");
    assert_eq!(service["tags"], json!(["canary", "tls"]));
    assert_eq!(service["tagged_addresses"]["wan"], "198.51.100.21");
}

#[tokio::test]
async fn serve_answers_each_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/app/name"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"Key": "app/name", "Value": "YXBp"}])),
        )
        .mount(&server)
        .await;

    let input = format!(
        "{}\n{}\n",
        json!({"op": "configure", "config": {"host": server.address().to_string(), "datacenter": "dc1"}}),
        json!({
            "op": "read_data_source",
            "type_name": "consulclient_keys",
            "config": {"key": [{"name": "name", "path": "app/name"}]}
        }),
    );
    let mut output = Vec::new();
    serve(Provider::new(), input.as_bytes(), &mut output)
        .await
        .unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["ok"], true);
    assert_eq!(responses[1]["ok"], true);
    assert_eq!(responses[1]["id"], "-");
    assert_eq!(responses[1]["state"]["var"]["name"], "api");
}
