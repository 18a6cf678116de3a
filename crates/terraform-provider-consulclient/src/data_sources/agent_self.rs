//! `consulclient_agent_self`: configuration of the agent the provider talks to.

use crate::config::ProviderConfig;
use crate::error::{ConsulResultExt, Result};
use crate::helpers::connect;
use crate::provider::DataSource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::ConsulApi;

/// The `consulclient_agent_self` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentSelfDataSource;

const STRING_ATTRIBUTES: [&str; 8] = [
    "advertise_addr",
    "bind_addr",
    "client_addr",
    "domain",
    "node_id",
    "node_name",
    "revision",
    "version",
];

#[async_trait]
impl DataSource for AgentSelfDataSource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        for name in STRING_ATTRIBUTES {
            schema.insert(name, Schema::string().computed());
        }
        schema.insert("server", Schema::bool().computed());
        schema
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, _) = connect(meta, d)?;
        let info = client
            .agent()
            .self_info()
            .await
            .context(|| "Failed to read Consul agent configuration".to_string())?;
        let config = info.config;

        let id = if config.node_id.is_empty() {
            config.node_name.clone()
        } else {
            config.node_id.clone()
        };

        d.set("datacenter", config.datacenter);
        d.set("node_name", config.node_name);
        d.set("node_id", config.node_id);
        d.set("server", config.server);
        d.set("revision", config.revision);
        d.set("version", config.version);
        d.set("domain", config.domain.unwrap_or_default());
        d.set("advertise_addr", config.advertise_addr.unwrap_or_default());
        d.set("bind_addr", config.bind_addr.unwrap_or_default());
        d.set("client_addr", config.client_addr.unwrap_or_default());
        d.set_id(id);
        Ok(())
    }
}
