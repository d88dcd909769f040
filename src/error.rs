// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Google Calendar not connected")]
    NotConnected,

    #[error("Calendar sync is disabled")]
    SyncDisabled,

    #[error("Failed to decrypt stored token")]
    Decryption,

    #[error("Google credentials are invalid or expired")]
    InvalidCredentials,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Google Calendar API error: {0}")]
    CalendarApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotConnected => (
                StatusCode::BAD_REQUEST,
                "calendar_not_connected",
                Some("Google Calendar not connected. Please connect your calendar first.".to_string()),
            ),
            AppError::SyncDisabled => (
                StatusCode::BAD_REQUEST,
                "sync_disabled",
                Some("Calendar sync is disabled. Please enable it in settings.".to_string()),
            ),
            AppError::Decryption => {
                tracing::error!("Stored refresh token could not be decrypted");
                (StatusCode::INTERNAL_SERVER_ERROR, "decryption_error", None)
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_google_credentials",
                Some("Google credentials are invalid or expired. Please reconnect your calendar.".to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::CalendarApi(msg) => {
                (StatusCode::BAD_GATEWAY, "google_calendar_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
