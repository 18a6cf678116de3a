//! # consulclient-core
//!
//! Core types and utilities for talking to a Consul agent over HTTP.
//!
//! This crate provides the error type, the HTTP transport, connection
//! settings and request options shared by the Consul endpoint bindings and
//! the Terraform provider built on top of them.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`uuid`] - Strongly-typed UUID wrappers for Consul objects
//! - [`config`] - Connection settings (address, scheme, TLS, credentials)
//! - [`client`] - HTTP client, builder and transport tuning
//! - [`query`] - Query/write options and query-string assembly

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod uuid;

// Re-export commonly used types
pub use client::{ClientConfig, ConsulClient, ConsulClientBuilder};
pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use query::{QueryOptions, WriteOptions};
