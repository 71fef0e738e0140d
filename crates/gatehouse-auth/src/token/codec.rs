//! Credential encodings.
//!
//! A codec turns a session identifier into a bearer string and back. The
//! string itself is never stored: the token record keeps its SHA-256 digest,
//! and every presented credential must match that digest regardless of
//! scheme.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use gatehouse_core::config::{AuthConfig, TokenConfig, TokenScheme};
use gatehouse_core::error::AppError;
use gatehouse_entity::token::TokenKind;

use crate::jwt::{Claims, JwtDecoder, JwtEncoder};

/// Encodes session identifiers into credentials and decodes them back.
pub trait TokenCodec: Send + Sync + 'static {
    fn scheme(&self) -> TokenScheme;

    /// Mint a credential of `kind` for `session_id`.
    fn mint(
        &self,
        session_id: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError>;

    /// Extract the session identifier, rejecting malformed, tampered,
    /// wrong-kind or self-evidently expired credentials.
    fn session_of(&self, raw: &str, kind: TokenKind) -> Result<Uuid, AppError>;

    /// Like [`TokenCodec::session_of`] but accepts expired credentials.
    fn session_of_ignoring_expiry(&self, raw: &str, kind: TokenKind) -> Result<Uuid, AppError> {
        self.session_of(raw, kind)
    }
}

/// Hex-encoded SHA-256 digest of a credential, as stored in the token record.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the codec selected by `token.scheme`.
pub fn build_codec(auth: &AuthConfig, token: &TokenConfig) -> Arc<dyn TokenCodec> {
    match token.scheme {
        TokenScheme::Jwt => Arc::new(JwtCodec::new(&auth.jwt_secret)),
        TokenScheme::Opaque => Arc::new(OpaqueCodec),
    }
}

/// HS256-signed JWT credentials.
#[derive(Debug, Clone)]
pub struct JwtCodec {
    encoder: JwtEncoder,
    decoder: JwtDecoder,
}

impl JwtCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoder: JwtEncoder::new(secret),
            decoder: JwtDecoder::new(secret),
        }
    }
}

impl TokenCodec for JwtCodec {
    fn scheme(&self) -> TokenScheme {
        TokenScheme::Jwt
    }

    fn mint(
        &self,
        session_id: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        self.encoder
            .encode(&Claims::new(session_id, kind, issued_at, expires_at))
    }

    fn session_of(&self, raw: &str, kind: TokenKind) -> Result<Uuid, AppError> {
        Ok(self.decoder.decode(raw, kind)?.sid)
    }

    fn session_of_ignoring_expiry(&self, raw: &str, kind: TokenKind) -> Result<Uuid, AppError> {
        Ok(self.decoder.decode_ignoring_expiry(raw, kind)?.sid)
    }
}

/// Random bearer strings of the form `<at|rt>_<session>_<secret>`, where
/// `session` is the simple-hex session id and `secret` 32 random bytes in hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueCodec;

const SECRET_HEX_LEN: usize = 64;

impl OpaqueCodec {
    fn prefix(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Access => "at_",
            TokenKind::Refresh => "rt_",
        }
    }
}

impl TokenCodec for OpaqueCodec {
    fn scheme(&self) -> TokenScheme {
        TokenScheme::Opaque
    }

    fn mint(
        &self,
        session_id: Uuid,
        kind: TokenKind,
        _issued_at: DateTime<Utc>,
        _expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let secret: [u8; 32] = rand::random();
        Ok(format!(
            "{}{}_{}",
            Self::prefix(kind),
            session_id.simple(),
            hex::encode(secret)
        ))
    }

    fn session_of(&self, raw: &str, kind: TokenKind) -> Result<Uuid, AppError> {
        let invalid = || AppError::unauthorized("Invalid token format");

        let body = raw.strip_prefix(Self::prefix(kind)).ok_or_else(|| {
            AppError::unauthorized(format!("Invalid token type: expected {kind} token"))
        })?;
        let (session, secret) = body.split_once('_').ok_or_else(invalid)?;

        if secret.len() != SECRET_HEX_LEN || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        Uuid::try_parse(session).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_opaque_codec_round_trip() {
        let codec = OpaqueCodec;
        let sid = Uuid::new_v4();
        let now = Utc::now();

        let access = codec
            .mint(sid, TokenKind::Access, now, now + Duration::minutes(1))
            .unwrap();
        let again = codec
            .mint(sid, TokenKind::Access, now, now + Duration::minutes(1))
            .unwrap();

        assert!(access.starts_with("at_"));
        assert_ne!(access, again);
        assert_eq!(codec.session_of(&access, TokenKind::Access).unwrap(), sid);
        assert!(codec.session_of(&access, TokenKind::Refresh).is_err());
    }

    #[test]
    fn test_opaque_codec_rejects_garbage() {
        let codec = OpaqueCodec;
        for raw in ["", "at_", "at_nothex_abc", "rt_123", "at_00000000000000000000000000000000"] {
            assert!(codec.session_of(raw, TokenKind::Access).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_build_codec_follows_scheme() {
        let auth = AuthConfig::default();
        let mut token = TokenConfig::default();
        assert_eq!(build_codec(&auth, &token).scheme(), TokenScheme::Jwt);

        token.scheme = TokenScheme::Opaque;
        assert_eq!(build_codec(&auth, &token).scheme(), TokenScheme::Opaque);
    }
}
