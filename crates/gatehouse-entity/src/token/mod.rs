//! Session token entities.

pub mod model;

pub use model::{NewToken, RevokeReason, TokenKind, TokenRecord, TokenSummary};
