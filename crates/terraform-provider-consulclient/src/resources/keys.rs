//! `consulclient_keys`: individually managed key/value entries.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::helpers::{connect, get_dc};
use crate::key_client::KeyClient;
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, Elem, ResourceSchema, Schema};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// ID shared by every instance; the keys themselves carry identity.
pub const KEYS_ID: &str = "consul";

/// The `consulclient_keys` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeysResource;

/// One element of a `key` set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct KeyBlock {
    pub name: String,
    pub path: String,
    pub value: String,
    pub default: String,
    pub delete: bool,
}

impl KeyBlock {
    /// Decode a `key` element.
    pub(crate) fn parse(raw: &Value) -> Result<Self> {
        let block = raw
            .as_object()
            .ok_or_else(|| ProviderError::decode("key", "failed to unroll: expected a block"))?;
        let text = |key: &str| {
            block
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let path = text("path");
        if path.is_empty() {
            return Err(ProviderError::decode("key.path", "failed to get path"));
        }
        Ok(Self {
            name: text("name"),
            path,
            value: text("value"),
            default: text("default"),
            delete: block.get("delete").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    /// Value as seen by configuration: what Consul holds, else the default.
    pub(crate) fn resolve(&self, stored: String) -> String {
        if stored.is_empty() {
            self.default.clone()
        } else {
            stored
        }
    }

    fn to_value(&self) -> Value {
        let mut block = Map::new();
        block.insert("name".into(), self.name.clone().into());
        block.insert("path".into(), self.path.clone().into());
        block.insert("value".into(), self.value.clone().into());
        block.insert("default".into(), self.default.clone().into());
        block.insert("delete".into(), self.delete.into());
        Value::Object(block)
    }
}

fn parse_all(items: &[Value]) -> Result<Vec<KeyBlock>> {
    items.iter().map(KeyBlock::parse).collect()
}

fn key_schema() -> ResourceSchema {
    let mut block = ResourceSchema::new();
    block.insert("name", Schema::string().optional());
    block.insert("path", Schema::string().required());
    block.insert("value", Schema::string().optional().computed());
    block.insert("default", Schema::string().optional());
    block.insert("delete", Schema::bool().optional().default_value(false));
    block
}

#[async_trait]
impl Resource for KeysResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("key", Schema::set(Elem::Block(key_schema())).optional());
        schema.insert("var", Schema::map().computed());
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        for key in parse_all(&d.get_set("key"))? {
            if !key.value.is_empty() {
                keys.put(&key.path, &key.value).await?;
            }
        }

        d.set_id(KEYS_ID);
        d.set("datacenter", dc);
        self.read(meta, d).await
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        let mut vars = BTreeMap::new();
        let mut refreshed = Vec::new();
        for mut key in parse_all(&d.get_set("key"))? {
            key.value = key.resolve(keys.get(&key.path).await?);
            if !key.name.is_empty() {
                vars.insert(key.name.clone(), Value::String(key.value.clone()));
            }
            refreshed.push(key.to_value());
        }

        d.set("key", refreshed);
        d.set("var", Value::Object(vars.into_iter().collect()));
        d.set("datacenter", dc);
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        if d.has_change("key") {
            let current = parse_all(&d.get_set("key"))?;
            let prior = match d.get_prior("key").and_then(Value::as_array) {
                Some(items) => parse_all(items)?,
                None => Vec::new(),
            };

            let mut written = BTreeSet::new();
            for key in &current {
                keys.put(&key.path, &key.value).await?;
                written.insert(key.path.as_str());
            }
            for key in prior.iter().filter(|k| !written.contains(k.path.as_str())) {
                if key.delete {
                    keys.delete(&key.path).await?;
                }
            }
        }

        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let keys = KeyClient::new(&client, &dc, &resolved.token);

        for key in parse_all(&d.get_set("key"))? {
            if key.delete {
                keys.delete(&key.path).await?;
            }
        }

        d.set_id("");
        Ok(())
    }
}
