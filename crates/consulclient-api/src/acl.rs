//! Legacy ACL endpoints.

use crate::models::{AclCreateResponse, AclEntry};
use crate::Result;
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use reqwest::Method;
use tracing::debug;

/// Legacy ACL endpoints (`/v1/acl/*`).
#[derive(Debug, Clone, Copy)]
pub struct Acl<'a> {
    client: &'a ConsulClient,
}

impl<'a> Acl<'a> {
    /// Bind the endpoint group to a client.
    #[must_use]
    pub const fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Fetch a single ACL entry. Returns `None` when Consul has no such ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn info(&self, id: &str, opts: &QueryOptions) -> Result<Option<AclEntry>> {
        debug!(id, "reading ACL entry");
        let path = format!("v1/acl/info/{id}");
        let entries: Option<Vec<AclEntry>> = self
            .client
            .send_json::<(), _>(Method::GET, &path, None, &opts.to_pairs(), opts.token())
            .await?;
        Ok(entries.and_then(|entries| entries.into_iter().next()))
    }

    /// Create an ACL entry and return its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create(&self, entry: &AclEntry, opts: &WriteOptions) -> Result<String> {
        debug!(name = %entry.name, "creating ACL entry");
        let response: AclCreateResponse = self
            .client
            .send_json(Method::PUT, "v1/acl/create", Some(entry), &opts.to_pairs(), opts.token())
            .await?;
        Ok(response.id)
    }

    /// Update an existing ACL entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update(&self, entry: &AclEntry, opts: &WriteOptions) -> Result<()> {
        debug!(id = %entry.id, "updating ACL entry");
        self.client
            .send_empty(Method::PUT, "v1/acl/update", Some(entry), &opts.to_pairs(), opts.token())
            .await
    }

    /// Destroy an ACL entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn destroy(&self, id: &str, opts: &WriteOptions) -> Result<()> {
        debug!(id, "destroying ACL entry");
        let path = format!("v1/acl/destroy/{id}");
        self.client
            .send_empty::<()>(Method::PUT, &path, None, &opts.to_pairs(), opts.token())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ACL_CLIENT_TYPE;
    use crate::ConsulApi;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ConsulClient {
        ConsulClient::new(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn info_returns_first_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/acl/info/abc"))
            .and(query_param("dc", "dc1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "ID": "abc",
                "Name": "agent",
                "Type": "client",
                "Rules": "{\"key\":{\"\":{\"policy\":\"read\"}}}",
                "CreateIndex": 3,
                "ModifyIndex": 3
            }])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let entry = client
            .acl()
            .info("abc", &QueryOptions::new("dc1", ""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.name, "agent");
        assert_eq!(entry.create_index, 3);
    }

    #[tokio::test]
    async fn info_null_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/acl/info/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let entry = client
            .acl()
            .info("missing", &QueryOptions::default())
            .await
            .unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn create_returns_id_and_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/acl/create"))
            .and(header("X-Consul-Token", "master"))
            .and(body_json(json!({"Name": "agent", "Type": "client", "Rules": ""})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "new-id"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let entry = AclEntry {
            name: "agent".into(),
            r#type: ACL_CLIENT_TYPE.into(),
            ..AclEntry::default()
        };
        let id = client
            .acl()
            .create(&entry, &WriteOptions::new("", "master"))
            .await
            .unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn destroy_puts_to_id_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/acl/destroy/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .acl()
            .destroy("abc", &WriteOptions::default())
            .await
            .unwrap();
    }
}
