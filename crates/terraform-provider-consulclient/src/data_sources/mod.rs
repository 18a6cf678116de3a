//! Read-only data source types.

pub mod agent_self;
pub mod catalog_nodes;
pub mod catalog_service;
pub mod catalog_services;
pub mod keys;
