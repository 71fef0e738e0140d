//! # gatehouse-auth
//!
//! Authentication and authorization engine for Gatehouse.
//!
//! ## Modules
//!
//! - `jwt`: HS256 claims encoding and decoding
//! - `password`: Argon2id password hashing
//! - `token`: credential codecs and the token lifecycle manager
//!   (issue, validate, refresh with rotation, revoke)
//! - `rbac`: the authorization resolver walking the policy graph

pub mod jwt;
pub mod password;
pub mod rbac;
pub mod token;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
pub use rbac::AuthorizationResolver;
pub use token::{Authenticated, TokenCodec, TokenManager, TokenPair};
