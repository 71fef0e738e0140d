//! # gatehouse-entity
//!
//! Domain entity models for Gatehouse. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and table rows
//! additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod policy;
pub mod token;
pub mod user;

use uuid::Uuid;

/// Actor recorded for changes made by the system itself (seeding, CLI).
pub const SYSTEM_ACTOR: Uuid = Uuid::nil();
