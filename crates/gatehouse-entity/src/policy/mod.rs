//! Policy graph entities: roles, permissions and the links between them.
//!
//! Every node and every edge is soft-deletable. A permission is granted to
//! a user only through a chain in which all four rows
//! (user-role link, role, role-permission link, permission) are live.

pub mod catalog;
pub mod codes;
pub mod link;

pub use catalog::{CatalogChanges, CatalogEntry, NewCatalogEntry, Permission, Role};
pub use codes::{Action, RESOURCES, all_codes};
pub use link::{PolicyLink, RolePermission, UserRole};
