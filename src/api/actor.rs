//! Acting-user extractor.
//!
//! Authentication happens upstream; the identity layer forwards the
//! authenticated user id in the `x-actor-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::UserId;
use crate::error::LogisticsError;

/// Header carrying the authenticated user id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated user performing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = LogisticsError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .map(Actor)
            .ok_or(LogisticsError::MissingActor)
    }
}
