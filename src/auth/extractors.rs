use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

pub const PROFILE_HEADER: &str = "x-profile-id";

/// Profile id of the caller, taken from the `X-Profile-Id` header.
pub struct CurrentProfile(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentProfile {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PROFILE_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or(AppError::Unauthenticated)?;

        Ok(CurrentProfile(id))
    }
}
