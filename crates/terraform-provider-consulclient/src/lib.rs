//! Terraform provider for Consul.
//!
//! Exposes Consul's catalog, key/value store, legacy ACLs, agent service
//! registration and prepared queries as resources and data sources. Every
//! callback resolves connection settings from the provider block and the
//! instance's own overrides, opens a [`consulclient_core::ConsulClient`],
//! issues one or two Consul calls and writes the answer back into the
//! instance's attributes.
//!
//! # Example
//!
//! ```ignore
//! use terraform_provider_consulclient::{serve, Provider};
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! serve(Provider::new(), stdin, tokio::io::stdout()).await?;
//! ```

#![deny(missing_docs)]

pub mod acl_client;
pub mod acl_rules;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod hashing;
pub mod helpers;
pub mod key_client;
pub mod provider;
pub mod resource_data;
pub mod resources;
pub mod schema;
pub mod server;

pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use provider::{DataSource, Provider, Resource};
pub use resource_data::ResourceData;
pub use server::{serve, Server};
