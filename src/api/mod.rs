// HTTP surface for the settings page

pub mod settings;

pub use settings::{create_settings_router, SettingsAppState};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types for the settings endpoints
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    ServerError(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::ServerError(format!("{:#}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ServerError(msg) => {
                tracing::error!(error = %msg, "Settings request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
