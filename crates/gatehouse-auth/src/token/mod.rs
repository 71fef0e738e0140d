//! Session credentials and their server-side lifecycle.

pub mod codec;
pub mod manager;

pub use codec::{JwtCodec, OpaqueCodec, TokenCodec, build_codec, hash_token};
pub use manager::{Authenticated, TokenManager, TokenPair};
