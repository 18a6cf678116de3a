//! `consulclient_acl`: a legacy ACL token.

use crate::acl_client::AclClient;
use crate::acl_rules::AclRules;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::helpers::{connect, get_dc};
use crate::provider::Resource;
use crate::resource_data::ResourceData;
use crate::schema::{connection_attributes, ResourceSchema, Schema};
use async_trait::async_trait;
use consulclient_api::models::AclEntry;
use tracing::warn;

/// The `consulclient_acl` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct AclResource;

fn entry_from(d: &ResourceData, rules: &AclRules) -> Result<AclEntry> {
    Ok(AclEntry {
        id: d.get_str("id").to_string(),
        name: d.get_str("name").to_string(),
        r#type: d.get_str("type").to_string(),
        rules: rules.encode()?,
        ..AclEntry::default()
    })
}

#[async_trait]
impl Resource for AclResource {
    fn schema(&self) -> ResourceSchema {
        let mut schema = connection_attributes();
        schema.insert("id", Schema::string().optional().computed().force_new());
        schema.insert("name", Schema::string().optional());
        schema.insert("type", Schema::string().optional());
        schema.insert("rules", Schema::dynamic().optional());
        schema
    }

    async fn create(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let acls = AclClient::new(&client, &dc, &resolved.token);

        let rules = AclRules::from_state(d.get("rules"))?;
        let mut entry = entry_from(d, &rules)?;
        acls.create(&mut entry).await?;
        d.set_id(entry.id);

        self.read(meta, d).await
    }

    async fn read(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let acls = AclClient::new(&client, &dc, &resolved.token);

        let Some(entry) = acls.read(d.id()).await? else {
            warn!(id = d.id(), dc = %dc, "ACL no longer exists, removing from state");
            d.set_id("");
            return Ok(());
        };

        let rules = AclRules::from_state(d.get("rules"))?.decode_like(&entry.rules)?;
        d.set_id(entry.id);
        d.set("name", entry.name);
        d.set("type", entry.r#type);
        d.set("rules", rules.to_value());
        d.set("datacenter", dc);
        Ok(())
    }

    async fn update(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        let acls = AclClient::new(&client, &dc, &resolved.token);

        let rules = AclRules::from_state(d.get("rules"))?;
        acls.update(&entry_from(d, &rules)?).await?;

        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderConfig, d: &mut ResourceData) -> Result<()> {
        let (client, resolved) = connect(meta, d)?;
        let dc = get_dc(d, &client).await?;
        AclClient::new(&client, &dc, &resolved.token)
            .delete(d.id())
            .await?;
        d.set_id("");
        Ok(())
    }
}
