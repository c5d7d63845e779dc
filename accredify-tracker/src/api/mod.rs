//! HTTP API handlers
//!
//! Thin wrappers: parse the request, call one service operation, map the
//! result. No domain rules live here.

pub mod ai;
pub mod evidence;
pub mod health;
pub mod indicators;
pub mod projects;

pub use ai::ai_routes;
pub use evidence::evidence_routes;
pub use health::health_routes;
pub use indicators::indicator_routes;
pub use projects::project_routes;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::models::UserId;
use crate::ApiError;

/// Header carrying the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Acting user taken from `X-User-Id`
///
/// Identity is asserted by the caller; authentication happens upstream.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::BadRequest("Missing X-User-Id header".to_string()))?
            .to_str()
            .map_err(|_| ApiError::BadRequest("X-User-Id header is not valid text".to_string()))?;

        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::BadRequest(format!("X-User-Id is not a UUID: {}", raw)))?;

        Ok(ActingUser(UserId(id)))
    }
}
