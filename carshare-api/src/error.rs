use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use carshare_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::EntityNotFound(_) => AppError::NotFoundError(message),
            CoreError::NoAvailableCars(_)
            | CoreError::RentalReturn(_)
            | CoreError::Payment(_) => AppError::ConflictError(message),
            CoreError::Validation(_) => AppError::ValidationError(message),
            CoreError::Provider(_) | CoreError::Storage(_) => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::EntityNotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::NoAvailableCars("x".into()), StatusCode::CONFLICT),
            (CoreError::RentalReturn("x".into()), StatusCode::CONFLICT),
            (CoreError::Payment("x".into()), StatusCode::CONFLICT),
            (CoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::Provider("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CoreError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
