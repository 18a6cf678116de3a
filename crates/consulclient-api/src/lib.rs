//! Typed bindings for the Consul HTTP API.
//!
//! Each endpoint group borrows a [`ConsulClient`] and exposes one method per
//! Consul call. Groups are reached through the [`ConsulApi`] extension trait:
//!
//! ```ignore
//! use consulclient_api::ConsulApi;
//!
//! let node = client.catalog().node("web-1", &QueryOptions::default()).await?;
//! ```

#![deny(missing_docs)]

mod acl;
mod agent;
mod catalog;
mod kv;
pub mod models;
mod prepared_query;

pub use acl::Acl;
pub use agent::Agent;
pub use catalog::Catalog;
pub use kv::Kv;
pub use prepared_query::PreparedQueries;

use consulclient_core::ConsulClient;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = consulclient_core::Result<T>;

/// Access to the endpoint groups of a [`ConsulClient`].
pub trait ConsulApi {
    /// Legacy ACL endpoints.
    fn acl(&self) -> Acl<'_>;
    /// Local agent endpoints.
    fn agent(&self) -> Agent<'_>;
    /// Catalog endpoints.
    fn catalog(&self) -> Catalog<'_>;
    /// Key/value store endpoints.
    fn kv(&self) -> Kv<'_>;
    /// Prepared query endpoints.
    fn prepared_queries(&self) -> PreparedQueries<'_>;
}

impl ConsulApi for ConsulClient {
    fn acl(&self) -> Acl<'_> {
        Acl::new(self)
    }

    fn agent(&self) -> Agent<'_> {
        Agent::new(self)
    }

    fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    fn kv(&self) -> Kv<'_> {
        Kv::new(self)
    }

    fn prepared_queries(&self) -> PreparedQueries<'_> {
        PreparedQueries::new(self)
    }
}

/// Collapse a not-found error into `None`.
pub(crate) fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
