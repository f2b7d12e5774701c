use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    auth::error::{AccountDeletionError, AuthError},
    gateway::GatewayError,
};

pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid X-Profile-Id header")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    AccountDeletion(#[from] AccountDeletionError),

    /// Any other backend failure, carrying the backend's message.
    #[error("{0}")]
    Backend(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NoRows => AppError::NotFound("Resource not found".into()),
            other => AppError::Backend(message_or_fallback(&other, FALLBACK_MESSAGE)),
        }
    }
}

pub(crate) fn message_or_fallback(e: &dyn std::error::Error, fallback: &str) -> String {
    let msg = e.to_string();
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(e) => match e {
                AuthError::MissingFields => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserIdTaken => StatusCode::CONFLICT,
                AuthError::CreateFailed | AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::AccountDeletion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match status {
            s if s.is_server_error() => tracing::error!(%status, "request failed: {}", self),
            _ => tracing::debug!(%status, "client error: {}", self),
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_to_uniform_messages() {
        assert!(matches!(AppError::from(GatewayError::NoRows), AppError::NotFound(_)));

        let e = AppError::from(GatewayError::Rejected("permission denied for table recipes".into()));
        assert_eq!(e.to_string(), "permission denied for table recipes");
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);

        let blank = AppError::from(GatewayError::Rejected("  ".into()));
        assert_eq!(blank.to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn auth_errors_keep_their_status() {
        assert_eq!(AppError::from(AuthError::UserIdTaken).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
