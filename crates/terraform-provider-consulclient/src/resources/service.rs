//! `consulclient_service`: an agent service addressed by an explicit ID.

use super::agent_service::{lookup, registration, write_back};
use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, ProviderError, Result};
use crate::helpers::connect;
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, AttributeType, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::ConsulApi;
use tracing::warn;

/// The `consulclient_service` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceResource;

/// `service_id` when set, else `name`.
fn identifier(d: &ResourceData) -> String {
    d.get_ok_str("service_id")
        .unwrap_or_else(|| d.get_str("name"))
        .to_string()
}

#[async_trait]
impl Resource for ServiceResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("address", Schema::string().optional().computed());
        schema.insert("service_id", Schema::string().optional().computed());
        schema.insert("name", Schema::string().required());
        schema.insert("port", Schema::int().optional());
        schema.insert(
            "tags",
            Schema::list(Elem::Primitive(AttributeType::String)).optional(),
        );
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let id = identifier(d);

        client
            .agent()
            .service_register(&registration(d, Some(id.clone()))?)
            .await
            .context(|| format!("Failed to register service '{id}' with Consul agent"))?;

        let service = lookup(&client, &id).await?.ok_or_else(|| {
            ProviderError::consul(
                format!("Failed to read service '{id}' from Consul agent"),
                consulclient_core::Error::NotFound(id.clone()),
            )
        })?;

        write_back(d, &service);
        d.set("service_id", service.id.clone());
        d.set_id(service.id);
        Ok(())
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let id = identifier(d);

        match lookup(&client, &id).await? {
            Some(service) => {
                write_back(d, &service);
                d.set("service_id", service.id.clone());
                d.set_id(service.id);
            }
            None => {
                warn!(service_id = %id, "Service no longer registered with agent, removing from state");
                d.set_id("");
            }
        }
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        self.create(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let id = identifier(d);

        client
            .agent()
            .service_deregister(&id)
            .await
            .context(|| format!("Failed to deregister service '{id}' from Consul agent"))?;

        d.set_id("");
        Ok(())
    }
}
