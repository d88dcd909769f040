// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error-to-HTTP mapping tests for the sync error taxonomy.

use altheia_backend::error::AppError;
use axum::http::StatusCode;
use axum::response::IntoResponse;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_precondition_errors_are_bad_request() {
    assert_eq!(status_of(AppError::NotConnected), StatusCode::BAD_REQUEST);
    assert_eq!(status_of(AppError::SyncDisabled), StatusCode::BAD_REQUEST);
}

#[test]
fn test_credential_errors() {
    assert_eq!(
        status_of(AppError::InvalidCredentials),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_of(AppError::Decryption),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_remote_sync_error_is_bad_gateway() {
    assert_eq!(
        status_of(AppError::CalendarApi("HTTP 503".to_string())),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_not_found_and_auth_errors() {
    assert_eq!(
        status_of(AppError::NotFound("Symptom log x".to_string())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(AppError::InvalidToken), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_internal_errors_hide_details() {
    assert_eq!(
        status_of(AppError::Database("connection refused".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(AppError::Internal(anyhow::anyhow!("boom"))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
