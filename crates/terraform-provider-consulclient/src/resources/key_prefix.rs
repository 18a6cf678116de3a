//! `consulclient_key_prefix`: exclusive ownership of every key under a prefix.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::helpers::{connect, get_dc};
use crate::key_client::KeyClient;
use crate::provider::Resource;
use crate::resource_data::{string_map, ResourceData};
use crate::schema::{connection_attributes, ResourceSchema, Schema};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

/// The `consulclient_key_prefix` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPrefixResource;

// An empty prefix would address the whole KV store.
fn path_prefix(d: &ResourceData) -> Result<String> {
    d.get_ok_str("path_prefix")
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Schema("attribute 'path_prefix' must not be empty".into()))
}

#[async_trait]
impl Resource for KeyPrefixResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("path_prefix", Schema::string().required().force_new());
        schema.insert("subkeys", Schema::map().required());
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let prefix = path_prefix(d)?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        let existing = keys.get_under_prefix(&prefix).await?;
        if !existing.is_empty() {
            return Err(ProviderError::PrefixInUse {
                count: existing.len(),
                prefix,
            });
        }

        for (subkey, value) in d.get_map("subkeys") {
            keys.put(&format!("{prefix}{subkey}"), &value).await?;
        }
        info!(prefix = %prefix, dc = %dc, "Claimed key prefix");

        d.set_id(prefix);
        d.set("datacenter", dc);
        self.read(meta, d).await
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);
        let prefix = d.id().to_string();

        let subkeys: Map<String, Value> = keys
            .get_under_prefix(&prefix)
            .await?
            .into_iter()
            .filter_map(|pair| {
                let name = pair.key.strip_prefix(prefix.as_str())?.to_string();
                Some((name, Value::String(pair.decoded_value())))
            })
            .collect();

        d.set("subkeys", subkeys);
        d.set("path_prefix", prefix);
        d.set("datacenter", dc);
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);
        let prefix = d.id().to_string();

        if d.has_change("subkeys") {
            let prior = string_map(d.get_prior("subkeys"));
            let current = d.get_map("subkeys");

            for (subkey, value) in &current {
                if prior.get(subkey) != Some(value) {
                    keys.put(&format!("{prefix}{subkey}"), value).await?;
                }
            }
            for subkey in prior.keys().filter(|k| !current.contains_key(*k)) {
                keys.delete(&format!("{prefix}{subkey}")).await?;
            }
        }

        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let prefix = path_prefix(d)?;
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        KeyClient::new(&client, &dc, &resolved.token)
            .delete_under_prefix(&prefix)
            .await?;
        d.set_id("");
        Ok(())
    }
}
