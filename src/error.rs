use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::response;
use crate::validation::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    Database(sqlx::Error),
    Session(tower_sessions::session::Error),
    Validation(ValidationErrors),
    NotFound(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => response::failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(errors),
                "Validation failed",
            )
            .into_response(),
            AppError::NotFound(message) => {
                response::failure(StatusCode::NOT_FOUND, None, message).into_response()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                response::failure(StatusCode::INTERNAL_SERVER_ERROR, None, "Server Error")
                    .into_response()
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {e}");
                response::failure(StatusCode::INTERNAL_SERVER_ERROR, None, "Server Error")
                    .into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::Session(e)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}
