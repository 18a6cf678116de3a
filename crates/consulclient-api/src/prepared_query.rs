//! Prepared query endpoints.

use crate::models::{PreparedQueryDefinition, QueryCreateResponse};
use crate::{optional, Result};
use consulclient_core::uuid::QueryId;
use consulclient_core::{ConsulClient, QueryOptions, WriteOptions};
use reqwest::Method;
use tracing::debug;

/// Prepared query endpoints (`/v1/query`).
#[derive(Debug, Clone, Copy)]
pub struct PreparedQueries<'a> {
    client: &'a ConsulClient,
}

impl<'a> PreparedQueries<'a> {
    /// Bind the endpoint group to a client.
    #[must_use]
    pub const fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Create a prepared query and return its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create(&self, query: &PreparedQueryDefinition, opts: &WriteOptions) -> Result<QueryId> {
        debug!(name = %query.name, "creating prepared query");
        let response: QueryCreateResponse = self
            .client
            .send_json(Method::POST, "v1/query", Some(query), &opts.to_pairs(), opts.token())
            .await?;
        Ok(response.id)
    }

    /// Replace the definition of an existing query.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update(&self, id: &QueryId, query: &PreparedQueryDefinition, opts: &WriteOptions) -> Result<()> {
        debug!(%id, "updating prepared query");
        let path = format!("v1/query/{id}");
        self.client
            .send_empty(Method::PUT, &path, Some(query), &opts.to_pairs(), opts.token())
            .await
    }

    /// Fetch a query definition. Returns `None` if Consul does not know it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &QueryId, opts: &QueryOptions) -> Result<Option<PreparedQueryDefinition>> {
        let path = format!("v1/query/{id}");
        let queries: Option<Option<Vec<PreparedQueryDefinition>>> = optional(
            self.client
                .send_json::<(), _>(Method::GET, &path, None, &opts.to_pairs(), opts.token())
                .await,
        )?;
        Ok(queries.flatten().and_then(|queries| queries.into_iter().next()))
    }

    /// Delete a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &QueryId, opts: &WriteOptions) -> Result<()> {
        debug!(%id, "deleting prepared query");
        let path = format!("v1/query/{id}");
        self.client
            .send_empty::<()>(Method::DELETE, &path, None, &opts.to_pairs(), opts.token())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceQuery;
    use crate::ConsulApi;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ID: &str = "8f246b77-f3e1-ff88-5b48-8ec93abf3e05";

    fn test_client(server: &MockServer) -> ConsulClient {
        ConsulClient::new(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn create_returns_query_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": ID})))
            .mount(&server)
            .await;

        let query = PreparedQueryDefinition {
            name: "db".into(),
            service: ServiceQuery {
                service: "postgres".into(),
                ..ServiceQuery::default()
            },
            ..PreparedQueryDefinition::default()
        };
        let id = test_client(&server)
            .prepared_queries()
            .create(&query, &WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(id.to_string(), ID);
    }

    #[tokio::test]
    async fn get_unknown_query_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/query/{ID}")))
            .respond_with(ResponseTemplate::new(404).set_body_string("Query not found"))
            .mount(&server)
            .await;

        let id: QueryId = ID.parse().unwrap();
        let query = test_client(&server)
            .prepared_queries()
            .get(&id, &QueryOptions::default())
            .await
            .unwrap();
        assert!(query.is_none());
    }

    #[tokio::test]
    async fn get_returns_first_definition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/query/{ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "ID": ID,
                "Name": "db",
                "Token": "",
                "Service": {"Service": "postgres", "OnlyPassing": true, "Tags": ["primary"]},
                "DNS": {"TTL": "10s"}
            }])))
            .mount(&server)
            .await;

        let id: QueryId = ID.parse().unwrap();
        let query = test_client(&server)
            .prepared_queries()
            .get(&id, &QueryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert!(query.service.only_passing);
        assert_eq!(query.dns.ttl, "10s");
    }
}
