//! The uniform JSON envelope wrapped around every response.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::validation::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
    pub message: &'static str,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

pub fn ok<T: Serialize>(data: T, message: &'static str) -> Reply<T> {
    with_data(StatusCode::OK, data, message)
}

pub fn created<T: Serialize>(data: T, message: &'static str) -> Reply<T> {
    with_data(StatusCode::CREATED, data, message)
}

/// Success without a `data` key, as returned by deletes.
pub fn done(message: &'static str) -> Reply<()> {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: None,
            errors: None,
            message,
        }),
    )
}

pub fn failure(
    status: StatusCode,
    errors: Option<ValidationErrors>,
    message: &'static str,
) -> Reply<()> {
    (
        status,
        Json(Envelope {
            success: false,
            data: None,
            errors,
            message,
        }),
    )
}

fn with_data<T: Serialize>(status: StatusCode, data: T, message: &'static str) -> Reply<T> {
    (
        status,
        Json(Envelope {
            success: true,
            data: Some(data),
            errors: None,
            message,
        }),
    )
}
