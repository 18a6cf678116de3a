//! Managed resource types.

pub mod acl;
pub mod agent_service;
pub mod catalog_entry;
pub mod key_prefix;
pub mod keys;
pub mod node;
pub mod prepared_query;
pub mod service;
