//! JWT validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use gatehouse_core::error::AppError;
use gatehouse_entity::token::TokenKind;

use super::claims::Claims;

/// Validates JWT signatures, expiry and token type.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
    lenient: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from the shared secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // seconds of clock skew

        let mut lenient = validation.clone();
        lenient.validate_exp = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lenient,
        }
    }

    /// Decodes a token of the expected kind, rejecting expired ones.
    pub fn decode(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        self.decode_with(token, kind, &self.validation)
    }

    /// Decodes a token of the expected kind, checking the signature but not expiry.
    pub fn decode_ignoring_expiry(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        self.decode_with(token, kind, &self.lenient)
    }

    fn decode_with(
        &self,
        token: &str,
        kind: TokenKind,
        validation: &Validation,
    ) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::unauthorized("Invalid token signature")
                }
                _ => AppError::unauthorized("Invalid token format"),
            })?
            .claims;

        if claims.typ != kind {
            return Err(AppError::unauthorized(format!(
                "Invalid token type: expected {kind} token"
            )));
        }
        Ok(claims)
    }
}
