//! Key/value store endpoints.

use crate::models::KvPair;
use crate::{optional, Result};
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use reqwest::Method;
use tracing::debug;

/// Key/value store endpoints (`/v1/kv/*`).
#[derive(Debug, Clone, Copy)]
pub struct Kv<'a> {
    client: &'a ConsulClient,
}

fn kv_path(key: &str) -> String {
    format!("v1/kv/{}", key.trim_start_matches('/'))
}

impl<'a> Kv<'a> {
    /// Bind the endpoint group to a client.
    #[must_use]
    pub const fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Read a single key. Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, key: &str, opts: &QueryOptions) -> Result<Option<KvPair>> {
        let pairs: Option<Option<Vec<KvPair>>> = optional(
            self.client
                .send_json::<(), _>(Method::GET, &kv_path(key), None, &opts.to_pairs(), opts.token())
                .await,
        )?;
        Ok(pairs.flatten().and_then(|pairs| pairs.into_iter().next()))
    }

    /// Write `value` at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put(&self, key: &str, value: &[u8], opts: &WriteOptions) -> Result<()> {
        debug!(key, "writing key");
        self.client
            .send_bytes(Method::PUT, &kv_path(key), value.to_vec(), &opts.to_pairs(), opts.token())
            .await
            .map(|_| ())
    }

    /// Delete a single key. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, key: &str, opts: &WriteOptions) -> Result<()> {
        debug!(key, "deleting key");
        self.client
            .send_empty::<()>(Method::DELETE, &kv_path(key), None, &opts.to_pairs(), opts.token())
            .await
    }

    /// Delete every key under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_tree(&self, prefix: &str, opts: &WriteOptions) -> Result<()> {
        debug!(prefix, "deleting key tree");
        let mut params = opts.to_pairs();
        params.push(("recurse", String::new()));
        self.client
            .send_empty::<()>(Method::DELETE, &kv_path(prefix), None, &params, opts.token())
            .await
    }

    /// List every pair under `prefix`. A prefix with no keys yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self, prefix: &str, opts: &QueryOptions) -> Result<Vec<KvPair>> {
        let mut params = opts.to_pairs();
        params.push(("recurse", String::new()));
        let pairs: Option<Option<Vec<KvPair>>> = optional(
            self.client
                .send_json::<(), _>(Method::GET, &kv_path(prefix), None, &params, opts.token())
                .await,
        )?;
        Ok(pairs.flatten().unwrap_or_default())
    }

    /// List the key names under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn keys(&self, prefix: &str, opts: &QueryOptions) -> Result<Vec<String>> {
        let mut params = opts.to_pairs();
        params.push(("keys", String::new()));
        let keys: Option<Option<Vec<String>>> = optional(
            self.client
                .send_json::<(), _>(Method::GET, &kv_path(prefix), None, &params, opts.token())
                .await,
        )?;
        Ok(keys.flatten().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConsulApi;
    use serde_json::json;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ConsulClient {
        ConsulClient::new(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn get_decodes_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/app/name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "Key": "app/name",
                "CreateIndex": 4,
                "ModifyIndex": 4,
                "LockIndex": 0,
                "Flags": 0,
                "Value": "d2Vi"
            }])))
            .mount(&server)
            .await;

        let pair = test_client(&server)
            .kv()
            .get("app/name", &QueryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pair.decoded_value(), "web");
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let pair = test_client(&server)
            .kv()
            .get("nope", &QueryOptions::default())
            .await
            .unwrap();
        assert!(pair.is_none());
    }

    #[tokio::test]
    async fn put_sends_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/app/name"))
            .and(query_param("dc", "dc1"))
            .and(body_string("web"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .kv()
            .put("app/name", b"web", &WriteOptions::new("dc1", ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_tree_recurses() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/kv/app/"))
            .and(query_param("recurse", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .kv()
            .delete_tree("app/", &WriteOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_of_empty_prefix_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/empty/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let pairs = test_client(&server)
            .kv()
            .list("empty/", &QueryOptions::default())
            .await
            .unwrap();
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn put_keeps_reserved_characters_in_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/app/what%3Fx"))
            .and(query_param("dc", "dc1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .kv()
            .put("app/what?x", b"1", &WriteOptions::new("dc1", ""))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("dc=dc1"));
    }
}
