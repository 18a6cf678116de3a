//! `consulclient_agent_service`: a service registered with the local agent.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, ProviderError, Result};
use crate::helpers::connect;
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::{AgentService, AgentServiceRegistration};
use consulclient_api::ConsulApi;
use consulclient_core::ConsulClient;
use tracing::warn;

/// The `consulclient_agent_service` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentServiceResource;

/// Registration built from the `name`, `address`, `port` and `tags`
/// attributes.
pub(crate) fn registration(d: &ResourceData, id: Option<String>) -> Result<AgentServiceRegistration> {
    let raw_port = d.get_i64("port");
    let port = u16::try_from(raw_port)
        .map_err(|_| ProviderError::decode("port", format!("{raw_port} is not a valid port")))?;
    let tags: Vec<String> = d
        .get_list("tags")
        .iter()
        .filter_map(|t| t.as_str().map(str::to_string))
        .collect();

    Ok(AgentServiceRegistration {
        id,
        name: d.get_str("name").to_string(),
        tags: (!tags.is_empty()).then_some(tags),
        port: (port > 0).then_some(port),
        address: d.get_ok_str("address").map(str::to_string),
        enable_tag_override: None,
    })
}

/// The agent's view of the service registered as `key`.
pub(crate) async fn lookup(client: &ConsulClient, key: &str) -> Result<Option<AgentService>> {
    let mut services = client
        .agent()
        .services()
        .await
        .context(|| format!("Failed to get services from Consul agent for '{key}'"))?;
    Ok(services.remove(key))
}

/// Copy a registered service into the common attributes.
pub(crate) fn write_back(d: &mut ResourceData, service: &AgentService) {
    d.set("address", service.address.clone());
    d.set("name", service.service.clone());
    d.set("port", service.port);
    d.set("tags", service.tags.clone().unwrap_or_default());
}

#[async_trait]
impl Resource for AgentServiceResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("address", Schema::string().optional().computed().force_new());
        schema.insert("id", Schema::string().computed());
        schema.insert("name", Schema::string().required().force_new());
        schema.insert("port", Schema::int().optional().force_new());
        schema.insert(
            "tags",
            Schema::list(Elem::Primitive(AttributeType::String))
                .optional()
                .force_new(),
        );
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let name = d.get_str("name").to_string();

        client
            .agent()
            .service_register(&registration(d, None)?)
            .await
            .context(|| format!("Failed to register service '{name}' with Consul agent"))?;

        let service = lookup(&client, &name).await?.ok_or_else(|| {
            ProviderError::consul(
                format!("Failed to lookup Consul service '{name}'"),
                consulclient_core::Error::NotFound(name.clone()),
            )
        })?;

        write_back(d, &service);
        d.set_id(service.id);
        Ok(())
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let name = d.get_str("name").to_string();

        match lookup(&client, &name).await? {
            Some(service) => {
                write_back(d, &service);
                d.set_id(service.id);
            }
            None => {
                warn!(service = %name, "Service no longer registered with agent, removing from state");
                d.set_id("");
            }
        }
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let id = d.id().to_string();

        client
            .agent()
            .service_deregister(&id)
            .await
            .context(|| format!("Failed to deregister service '{id}' from Consul agent"))?;

        d.set_id("");
        Ok(())
    }
}
