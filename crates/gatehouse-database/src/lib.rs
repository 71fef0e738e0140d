//! # gatehouse-database
//!
//! Persistence for Gatehouse: the store contracts consumed by the auth and
//! service layers, their PostgreSQL implementations, and in-memory
//! implementations used by tests and embedded deployments.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::Stores;
