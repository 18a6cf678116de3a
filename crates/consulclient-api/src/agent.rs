//! Local agent endpoints.

use crate::models::{AgentSelf, AgentService, AgentServiceRegistration};
use crate::Result;
use consulclient_core::ConsulClient;
use reqwest::Method;
use std::collections::HashMap;
use tracing::debug;

/// Local agent endpoints (`/v1/agent/*`).
///
/// These calls act on the agent the client is connected to, so no datacenter
/// scoping applies.
#[derive(Debug, Clone, Copy)]
pub struct Agent<'a> {
    client: &'a ConsulClient,
}

impl<'a> Agent<'a> {
    /// Bind the endpoint group to a client.
    #[must_use]
    pub const fn new(client: &'a ConsulClient) -> Self {
        Self { client }
    }

    /// Read the agent's configuration and membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn self_info(&self) -> Result<AgentSelf> {
        self.client
            .send_json::<(), _>(Method::GET, "v1/agent/self", None, &[], None)
            .await
    }

    /// Datacenter of the connected agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn datacenter(&self) -> Result<String> {
        Ok(self.self_info().await?.config.datacenter)
    }

    /// Register a service with the agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn service_register(&self, registration: &AgentServiceRegistration) -> Result<()> {
        debug!(name = %registration.name, "registering agent service");
        self.client
            .send_empty(Method::PUT, "v1/agent/service/register", Some(registration), &[], None)
            .await
    }

    /// Deregister a service from the agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn service_deregister(&self, id: &str) -> Result<()> {
        debug!(id, "deregistering agent service");
        let path = format!("v1/agent/service/deregister/{id}");
        self.client
            .send_empty::<()>(Method::PUT, &path, None, &[], None)
            .await
    }

    /// Services registered with the agent, keyed by instance ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn services(&self) -> Result<HashMap<String, AgentService>> {
        let services: Option<HashMap<String, AgentService>> = self
            .client
            .send_json::<(), _>(Method::GET, "v1/agent/services", None, &[], None)
            .await?;
        Ok(services.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConsulApi;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ConsulClient {
        ConsulClient::new(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn datacenter_comes_from_self_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/self"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Config": {"Datacenter": "east", "NodeName": "agent-1", "Server": true},
                "Member": {"Name": "agent-1"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(client.agent().datacenter().await.unwrap(), "east");
    }

    #[tokio::test]
    async fn register_omits_unset_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .and(body_json(json!({"Name": "google", "Port": 80, "Tags": ["a"]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let registration = AgentServiceRegistration {
            name: "google".into(),
            port: Some(80),
            tags: Some(vec!["a".into()]),
            ..AgentServiceRegistration::default()
        };
        test_client(&server)
            .agent()
            .service_register(&registration)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn services_are_keyed_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "google": {"ID": "google", "Service": "google", "Tags": null, "Port": 80, "Address": "www.google.com"}
            })))
            .mount(&server)
            .await;

        let services = test_client(&server).agent().services().await.unwrap();
        assert_eq!(services["google"].address, "www.google.com");
    }
}
