// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar connection and sync routes.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::google_calendar::CALENDAR_SCOPE;
use crate::services::CalendarStatus;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long an OAuth state parameter stays valid.
const STATE_MAX_AGE_MILLIS: u128 = 10 * 60 * 1000;

/// Routes that require authentication (layered in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/google-calendar/auth", get(auth_start))
        .route("/api/google-calendar/disconnect", post(disconnect))
        .route("/api/google-calendar/status", get(status))
        .route("/api/google-calendar/sync", post(sync_one))
        .route("/api/google-calendar/sync-all", post(sync_all))
        .route("/api/google-calendar/sync/{log_id}", delete(delete_sync))
        .route("/api/google-calendar/toggle-sync", post(toggle_sync))
}

/// Public routes: the OAuth callback is requested by Google's redirect, so
/// it authenticates via the signed state parameter instead of a session.
pub fn callback_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/google-calendar/callback", get(auth_callback))
}

// ─── OAuth Connect Flow ──────────────────────────────────────

#[derive(Serialize)]
struct AuthStartResponse {
    authorization_url: String,
    state: String,
}

/// Start the OAuth flow: return Google's consent URL.
///
/// The user id rides through Google's redirect inside an HMAC-signed state
/// parameter, so the callback can attribute the code without a session.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AuthStartResponse>> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(&user.user_id, timestamp, &state.config.oauth_state_key)?;

    let authorization_url = format!(
        "https://accounts.google.com/o/oauth2/auth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         access_type=offline&\
         include_granted_scopes=true&\
         prompt=consent&\
         state={}",
        state.config.google_client_id,
        urlencoding::encode(&state.config.google_redirect_uri),
        urlencoding::encode(CALENDAR_SCOPE),
        oauth_state
    );

    tracing::info!(user_id = %user.user_id, "Starting Google Calendar OAuth flow");

    Ok(Json(AuthStartResponse {
        authorization_url,
        state: oauth_state,
    }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: verify state, exchange the code, store the connection.
/// Always redirects back to the frontend settings page with a status.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let settings_url = format!("{}/settings", state.config.frontend_url);

    let Some(user_id) = verify_and_decode_state(&params.state, &state.config.oauth_state_key)
    else {
        tracing::warn!("Invalid or expired OAuth state parameter");
        return Redirect::temporary(&format!(
            "{}?calendar_status=error&message=invalid_state",
            settings_url
        ));
    };

    if let Some(error) = params.error {
        tracing::warn!(user_id = %user_id, error = %error, "OAuth error from Google");
        return Redirect::temporary(&format!(
            "{}?calendar_status=error&message={}",
            settings_url,
            urlencoding::encode(&error)
        ));
    }

    let Some(code) = params.code else {
        return Redirect::temporary(&format!(
            "{}?calendar_status=error&message=missing_code",
            settings_url
        ));
    };

    match state
        .calendar_sync
        .complete_connection(&user_id, &code, &state.config.google_redirect_uri)
        .await
    {
        Ok(()) => Redirect::temporary(&format!("{}?calendar_status=connected", settings_url)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to complete calendar connection");
            Redirect::temporary(&format!(
                "{}?calendar_status=error&message={}",
                settings_url,
                urlencoding::encode(&e.to_string())
            ))
        }
    }
}

#[derive(Serialize)]
struct DisconnectResponse {
    message: String,
    status: String,
}

/// Disconnect Google Calendar. Local state always clears, even when the
/// remote revocation fails.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DisconnectResponse>> {
    state.calendar_sync.disconnect(&user.user_id).await?;

    Ok(Json(DisconnectResponse {
        message: "Google Calendar disconnected successfully".to_string(),
        status: "disconnected".to_string(),
    }))
}

/// Calendar connection and sync status.
async fn status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarStatus>> {
    let status = state.calendar_sync.status(&user.user_id).await?;
    Ok(Json(status))
}

// ─── Sync Operations ─────────────────────────────────────────

#[derive(Deserialize)]
struct SyncLogRequest {
    log_id: String,
}

/// Response for single-log sync and delete operations.
#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    message: String,
    event_id: String,
}

/// Sync a single symptom log to Google Calendar.
async fn sync_one(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SyncLogRequest>,
) -> Result<Json<SyncResponse>> {
    let event_id = state
        .calendar_sync
        .sync_one(&user.user_id, &request.log_id)
        .await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "Symptom log synced successfully".to_string(),
        event_id,
    }))
}

#[derive(Serialize)]
struct BatchSyncResponse {
    success: bool,
    message: String,
    synced_count: usize,
    failed_count: usize,
}

/// Sync all symptom logs (initial setup or full re-sync).
async fn sync_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BatchSyncResponse>> {
    let outcome = state.calendar_sync.sync_all(&user.user_id).await?;

    let total = outcome.synced_count() + outcome.failed_count;
    Ok(Json(BatchSyncResponse {
        success: true,
        message: format!("Synced {} of {} logs", outcome.synced_count(), total),
        synced_count: outcome.synced_count(),
        failed_count: outcome.failed_count,
    }))
}

/// Remove the calendar event for a log. The log itself stays in the app.
async fn delete_sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(log_id): Path<String>,
) -> Result<Json<SyncResponse>> {
    let event_id = state
        .calendar_sync
        .delete_sync(&user.user_id, &log_id)
        .await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "Calendar event deleted successfully".to_string(),
        event_id,
    }))
}

#[derive(Deserialize)]
struct ToggleSyncQuery {
    enabled: bool,
}

#[derive(Serialize)]
struct ToggleSyncResponse {
    success: bool,
    message: String,
    sync_enabled: bool,
}

/// Enable or disable automatic calendar sync.
async fn toggle_sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ToggleSyncQuery>,
) -> Result<Json<ToggleSyncResponse>> {
    state
        .calendar_sync
        .set_sync_enabled(&user.user_id, query.enabled)
        .await?;

    let verb = if query.enabled { "enabled" } else { "disabled" };
    Ok(Json(ToggleSyncResponse {
        success: true,
        message: format!("Calendar sync {}", verb),
        sync_enabled: query.enabled,
    }))
}

// ─── Signed OAuth State ──────────────────────────────────────

/// Sign `user_id|timestamp` into a URL-safe state parameter.
fn sign_state(user_id: &str, timestamp_millis: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", user_id, timestamp_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and expiry, returning the embedded user id.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "user_id|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}", user_id, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    // Reject stale states
    let timestamp = u128::from_str_radix(timestamp_hex, 16).ok()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_millis();
    if now.saturating_sub(timestamp) > STATE_MAX_AGE_MILLIS {
        tracing::warn!("OAuth state parameter expired");
        return None;
    }

    Some(user_id.to_string())
}
