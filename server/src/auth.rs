//! Bearer token verification and claim extraction.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use availability_core::pipeline::Caller;

use crate::error::ServiceError;
use crate::SharedContext;

/// Patron claims carried in the session JWT.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "homeLibrary")]
    pub home_library: String,
    #[serde(rename = "canPlaceReserve")]
    pub can_place_reserve: bool,
}

/// A verified request: the raw token (forwarded to the circulation backend)
/// plus its decoded claims.
#[derive(Debug, Clone)]
pub struct Auth {
    pub token: String,
    pub claims: Claims,
}

impl Auth {
    pub fn caller(&self) -> Caller {
        Caller {
            home_library: self.claims.home_library.clone(),
            can_place_reserve: self.claims.can_place_reserve,
        }
    }
}

#[async_trait]
impl FromRequestParts<SharedContext> for Auth {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::NotAuthorized)?;

        let key = DecodingKey::from_secret(state.config.jwt_key.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|err| {
                tracing::warn!(%err, "rejected bearer token");
                ServiceError::NotAuthorized
            })?;

        Ok(Self { token: token.to_string(), claims: data.claims })
    }
}
