//! services/api/src/adapters/identity.rs
//!
//! Bearer-token identity resolver implementing the `IdentityService` port.
//! Verifies an HS256 JWT issued by the authentication provider and extracts
//! the `sub` claim as the stable user identifier.

use async_trait::async_trait;
use journal_core::ports::{IdentityService, PortError, PortResult};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct JwtIdentityAdapter {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityAdapter {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The provider issues tokens for several audiences; only expiry and
        // signature matter here.
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityService for JwtIdentityAdapter {
    async fn resolve_user(&self, bearer_token: &str) -> PortResult<String> {
        let token = decode::<Claims>(bearer_token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("bearer token rejected: {e}");
                PortError::Unauthorized
            })?;
        Ok(token.claims.sub)
    }
}
