//! In-memory store implementations.
//!
//! Each store guards its rows with a single `tokio::sync` lock and runs every
//! compound operation under one acquisition, which gives the same atomicity
//! the PostgreSQL repositories get from transactions.

pub mod audit;
pub mod catalog;
pub mod credential;
pub mod graph;
pub mod link;
pub mod token;

pub use audit::MemoryChangeLogStore;
pub use catalog::MemoryCatalogStore;
pub use credential::MemoryCredentialStore;
pub use graph::MemoryPolicyGraph;
pub use link::{CascadeTarget, MemoryLinkStore};
pub use token::MemoryTokenStore;
