// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Symptom log, article, and chat routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::symptom_log::validate_log_date;
use crate::models::{Article, SymptomLogInput, SymptomLogResponse};
use crate::AppState;

const DEFAULT_ARTICLE_LIMIT: u32 = 10;
const MAX_ARTICLE_LIMIT: u32 = 100;

/// Symptom log routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/logs", post(upsert_log))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{date}", delete(delete_log))
}

/// Article listing and chat proxy (no authentication, like the frontend
/// landing pages that consume them).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/articles", get(list_articles))
        .route("/api/chat", post(chat))
}

// ─── Symptom Logs ────────────────────────────────────────────

/// Create or update the symptom log for a date.
///
/// One log per user per day: re-submitting a date overwrites that day's
/// symptoms and notes while keeping the log's identity.
async fn upsert_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<SymptomLogInput>,
) -> Result<Json<SymptomLogResponse>> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let log = state.db.upsert_log(&user.user_id, &input).await?;

    tracing::debug!(user_id = %user.user_id, log_id = %log.id, date = %log.date, "Upserted symptom log");
    Ok(Json(log.into()))
}

#[derive(Deserialize)]
struct LogsQuery {
    /// Range start, inclusive (YYYY-MM-DD)
    start_date: Option<String>,
    /// Range end, inclusive (YYYY-MM-DD)
    end_date: Option<String>,
}

/// List the current user's symptom logs, newest first.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<SymptomLogResponse>>> {
    for date in [&query.start_date, &query.end_date].into_iter().flatten() {
        validate_log_date(date)
            .map_err(|_| AppError::BadRequest(format!("Invalid date: {}", date)))?;
    }

    let logs = state
        .db
        .list_logs(
            &user.user_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?;

    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

/// Delete the symptom log for a date.
async fn delete_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
) -> Result<StatusCode> {
    validate_log_date(&date)
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {}", date)))?;

    if !state.db.delete_log_by_date(&user.user_id, &date).await? {
        return Err(AppError::NotFound(format!(
            "No symptom log found for date {}",
            date
        )));
    }

    tracing::debug!(user_id = %user.user_id, date = %date, "Deleted symptom log");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Articles ────────────────────────────────────────────────

#[derive(Deserialize)]
struct ArticlesQuery {
    category: Option<String>,
    limit: Option<u32>,
    skip: Option<u32>,
}

/// List articles, newest first, optionally filtered by category.
async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<Vec<Article>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ARTICLE_LIMIT)
        .clamp(1, MAX_ARTICLE_LIMIT);
    let skip = query.skip.unwrap_or(0);

    let articles = state
        .db
        .list_articles(query.category.as_deref(), limit, skip)
        .await?;

    Ok(Json(articles))
}

// ─── Chat ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

/// Forward a message to the women's health chatbot.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let response = state.chat_service.get_response(&request.message).await;

    Ok(Json(ChatResponse { response }))
}
