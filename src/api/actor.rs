//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in `x-actor-id`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;
use crate::domain::value_objects::UserId;
use crate::services::Actor;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_HEADER} header")))?;

        raw.trim()
            .parse::<UserId>()
            .map(Actor::new)
            .map_err(|_| ApiError::Unauthorized(format!("malformed {ACTOR_HEADER} header")))
    }
}
