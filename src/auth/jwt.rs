//! JWT Token Decoding
//!
//! The console only reads the payload of the bearer token it was handed.
//! Signatures are checked by the backend on every authenticated call, so
//! decoding here skips signature, audience and expiry validation and the
//! expiry is compared locally by the session.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::auth::errors::AuthError;
use crate::auth::models::Claims;

/// Decodes bearer tokens into normalized [`Claims`].
#[derive(Clone)]
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl TokenDecoder {
    pub fn new() -> Self {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&[]),
            validation,
        }
    }

    /// Decode `token` into canonical claims.
    ///
    /// Anything other than three dot-separated parts with a JSON object
    /// payload is rejected.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let parts = token.split('.').count();
        if parts != 3 {
            tracing::debug!("Rejecting token with {} parts", parts);
            return Err(AuthError::MalformedToken(format!(
                "expected 3 parts, found {}",
                parts
            )));
        }

        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        Ok(Claims::from_payload(&data.claims))
    }
}

impl Default for TokenDecoder {
    fn default() -> Self {
        Self::new()
    }
}
