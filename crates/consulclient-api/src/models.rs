//! Consul wire models shared by the endpoint bindings.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use consulclient_core::uuid::{QueryId, SessionId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// ACL
// ============================================================================

/// Legacy ACL token type for management tokens.
pub const ACL_MANAGEMENT_TYPE: &str = "management";

/// Legacy ACL token type for client tokens.
pub const ACL_CLIENT_TYPE: &str = "client";

/// Legacy ACL entry (`/v1/acl/info`, `/v1/acl/create`, `/v1/acl/update`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AclEntry {
    /// Token ID; Consul generates one on create when empty.
    #[serde(rename = "ID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// `client` or `management`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    /// Rule set as sent to Consul.
    #[serde(default)]
    pub rules: String,
    /// Raft index at creation.
    #[serde(default, skip_serializing)]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(default, skip_serializing)]
    pub modify_index: u64,
}

/// Body returned by `/v1/acl/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct AclCreateResponse {
    /// ID of the new token.
    #[serde(rename = "ID")]
    pub id: String,
}

// ============================================================================
// Catalog
// ============================================================================

/// A service as registered on a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    /// Service instance ID.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Service name.
    #[serde(default)]
    pub service: String,
    /// Tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Port.
    #[serde(default)]
    pub port: u16,
    /// Service address, empty to use the node address.
    #[serde(default)]
    pub address: String,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, String>>,
    /// Whether tag changes from the catalog override the agent.
    #[serde(default)]
    pub enable_tag_override: bool,
}

/// Catalog registration request (`/v1/catalog/register`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogRegistration {
    /// Node ID.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Node name.
    pub node: String,
    /// Node address.
    pub address: String,
    /// Target datacenter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    /// Tagged addresses such as `lan` and `wan`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagged_addresses: Option<HashMap<String, String>>,
    /// Node metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_meta: Option<HashMap<String, String>>,
    /// Service to register on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<AgentService>,
    /// Skip updating the node itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_node_update: Option<bool>,
}

/// Catalog deregistration request (`/v1/catalog/deregister`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogDeregistration {
    /// Node name.
    pub node: String,
    /// Node address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Target datacenter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    /// Remove only this service.
    #[serde(rename = "ServiceID", default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Remove only this check.
    #[serde(rename = "CheckID", default, skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
}

/// A catalog node (`/v1/catalog/nodes`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    /// Node ID.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Node name.
    #[serde(default)]
    pub node: String,
    /// Node address.
    #[serde(default)]
    pub address: String,
    /// Datacenter.
    #[serde(default)]
    pub datacenter: String,
    /// Tagged addresses.
    #[serde(default)]
    pub tagged_addresses: Option<HashMap<String, String>>,
    /// Node metadata.
    #[serde(default)]
    pub meta: Option<HashMap<String, String>>,
    /// Raft index at creation.
    #[serde(default)]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(default)]
    pub modify_index: u64,
}

/// A node and its services (`/v1/catalog/node/:node`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNode {
    /// The node.
    #[serde(default)]
    pub node: Option<Node>,
    /// Services keyed by instance ID.
    #[serde(default)]
    pub services: Option<HashMap<String, AgentService>>,
}

/// A service instance as listed by `/v1/catalog/service/:service`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogService {
    /// Node ID.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Node name.
    #[serde(default)]
    pub node: String,
    /// Node address.
    #[serde(default)]
    pub address: String,
    /// Datacenter.
    #[serde(default)]
    pub datacenter: String,
    /// Node tagged addresses.
    #[serde(default)]
    pub tagged_addresses: Option<HashMap<String, String>>,
    /// Node metadata.
    #[serde(default)]
    pub node_meta: Option<HashMap<String, String>>,
    /// Service instance ID.
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    /// Service name.
    #[serde(default)]
    pub service_name: String,
    /// Service address, empty when it equals the node address.
    #[serde(default)]
    pub service_address: String,
    /// Service tags.
    #[serde(default)]
    pub service_tags: Option<Vec<String>>,
    /// Service port.
    #[serde(default)]
    pub service_port: u16,
    /// Tag override flag.
    #[serde(default)]
    pub service_enable_tag_override: bool,
    /// Raft index at creation.
    #[serde(default)]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(default)]
    pub modify_index: u64,
}

// ============================================================================
// KV
// ============================================================================

/// A key/value entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct KvPair {
    /// Full key path.
    pub key: String,
    /// Raft index at creation.
    #[serde(default)]
    pub create_index: u64,
    /// Raft index at last modification.
    #[serde(default)]
    pub modify_index: u64,
    /// Lock index.
    #[serde(default)]
    pub lock_index: u64,
    /// Opaque client flags.
    #[serde(default)]
    pub flags: u64,
    /// Base64-encoded value.
    #[serde(default)]
    pub value: Option<String>,
    /// Session holding the lock, if any.
    #[serde(default)]
    pub session: Option<String>,
}

impl KvPair {
    /// Raw bytes of the value.
    #[must_use]
    pub fn raw_value(&self) -> Option<Vec<u8>> {
        self.value.as_ref().and_then(|v| BASE64.decode(v).ok())
    }

    /// Value decoded as UTF-8, lossily.
    #[must_use]
    pub fn decoded_value(&self) -> String {
        self.raw_value()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Service registration against the local agent (`/v1/agent/service/register`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceRegistration {
    /// Instance ID; defaults to the name on the agent side.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Service name.
    pub name: String,
    /// Tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Tag override flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_tag_override: Option<bool>,
}

/// The `Config` section of `/v1/agent/self`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentConfig {
    /// Datacenter the agent belongs to.
    #[serde(default)]
    pub datacenter: String,
    /// Node name.
    #[serde(default)]
    pub node_name: String,
    /// Node ID.
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    /// Whether the agent runs in server mode.
    #[serde(default)]
    pub server: bool,
    /// Git revision.
    #[serde(default)]
    pub revision: String,
    /// Version string.
    #[serde(default)]
    pub version: String,
    /// DNS domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Advertised address.
    #[serde(default)]
    pub advertise_addr: Option<String>,
    /// Bind address.
    #[serde(default)]
    pub bind_addr: Option<String>,
    /// Client address.
    #[serde(default)]
    pub client_addr: Option<String>,
}

/// Body of `/v1/agent/self`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentSelf {
    /// Agent configuration.
    #[serde(default)]
    pub config: AgentConfig,
    /// Serf member record, passed through untouched.
    #[serde(default)]
    pub member: Option<serde_json::Value>,
    /// Node metadata.
    #[serde(default)]
    pub meta: Option<BTreeMap<String, String>>,
}

// ============================================================================
// Prepared queries
// ============================================================================

// Consul renders empty lists in query definitions as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// An unbound query carries `"Session": ""`.
fn blank_session<'de, D>(deserializer: D) -> Result<Option<SessionId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => SessionId::parse_str(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Failover policy of a prepared query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct QueryDatacenterOptions {
    /// Fail over to the N nearest datacenters.
    #[serde(default)]
    pub nearest_n: u32,
    /// Explicit failover datacenters, tried in order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datacenters: Vec<String>,
}

/// Service selection of a prepared query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceQuery {
    /// Service name.
    #[serde(default)]
    pub service: String,
    /// Failover policy.
    #[serde(default)]
    pub failover: QueryDatacenterOptions,
    /// Only return instances with passing checks.
    #[serde(default)]
    pub only_passing: bool,
    /// Sort by distance to this node.
    #[serde(default)]
    pub near: String,
    /// Required tags; `!tag` excludes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// DNS settings of a prepared query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryDnsOptions {
    /// TTL for DNS answers, e.g. `30s`.
    #[serde(rename = "TTL", default)]
    pub ttl: String,
}

/// Template settings of a prepared query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct QueryTemplate {
    /// Template type, `name_prefix_match`.
    #[serde(default)]
    pub r#type: String,
    /// Regular expression applied to the query name.
    #[serde(default)]
    pub regexp: String,
}

/// A prepared query definition (`/v1/query`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedQueryDefinition {
    /// Query ID, assigned by Consul.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QueryId>,
    /// Query name.
    #[serde(default)]
    pub name: String,
    /// Session the query is bound to.
    #[serde(
        default,
        deserialize_with = "blank_session",
        skip_serializing_if = "Option::is_none"
    )]
    pub session: Option<SessionId>,
    /// Token stored with the query and used when it executes.
    #[serde(default)]
    pub token: String,
    /// Service selection.
    #[serde(default)]
    pub service: ServiceQuery,
    /// DNS settings.
    #[serde(rename = "DNS", default)]
    pub dns: QueryDnsOptions,
    /// Template settings.
    #[serde(default)]
    pub template: QueryTemplate,
}

/// Body returned by `POST /v1/query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryCreateResponse {
    /// ID of the new query.
    #[serde(rename = "ID")]
    pub id: QueryId,
}
