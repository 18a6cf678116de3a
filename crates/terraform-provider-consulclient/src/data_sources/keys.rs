//! `consulclient_keys`: read key/value entries with fallbacks.

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::helpers::{connect, get_dc};
use crate::key_client::KeyClient;
use crate::provider::DataSource;
use crate::resource_data::ResourceData;
use crate::resources::keys::KeyBlock;
use crate::schema::{connection_attributes, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The `consulclient_keys` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeysDataSource;

#[async_trait]
impl DataSource for KeysDataSource {
    fn schema(&self) -> ResourceSchema {
        let mut key = ResourceSchema::new();
        key.insert("name", Schema::string().required());
        key.insert("path", Schema::string().required());
        key.insert("default", Schema::string().optional());

        let mut schema = connection_attributes();
        schema.insert("key", Schema::set(Elem::Block(key)).optional());
        schema.insert("var", Schema::map().computed());
        schema
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        let mut vars = Map::new();
        for raw in d.get_set("key") {
            let key = KeyBlock::parse(&raw)?;
            let value = key.resolve(keys.get(&key.path).await?);
            vars.insert(key.name, Value::String(value));
        }

        d.set("var", vars);
        d.set("datacenter", dc);
        d.set_id("-");
        Ok(())
    }
}
