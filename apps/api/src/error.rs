use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use patchgate_core::AppError;
use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    NotFound(String),
    Unauthorized(String),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::App(AppError::BadRequest { .. }) => StatusCode::BAD_REQUEST,
            Self::App(AppError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Self::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::App(error) => error
                .message()
                .map_or_else(|| "internal server error".to_owned(), str::to_owned),
            Self::NotFound(message) | Self::Unauthorized(message) => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::App(error) if !error.is_client_error() => {
                tracing::error!(error = %error, "request failed");
            }
            Self::App(error) => tracing::info!(error = %error, "request rejected"),
            Self::NotFound(message) | Self::Unauthorized(message) => {
                tracing::info!(status = %status, message = %message, "request rejected");
            }
        }

        let payload = Json(ErrorResponse {
            message: self.message(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
