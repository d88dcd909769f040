// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: offline app state, emulator gating, and an
//! in-process fake Google Calendar API server.

#![allow(dead_code)]

use altheia_backend::config::Config;
use altheia_backend::db::FirestoreDb;
use altheia_backend::services::{
    CalendarSyncService, ChatService, GoogleCalendarClient, GoogleCalendarService, SecretCipher,
};
use altheia_backend::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// AES key shared by tests that need to decrypt what they encrypted.
pub const TEST_CIPHER_KEY: [u8; 32] = [9u8; 32];

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = test_db_offline();

    let cipher = SecretCipher::new(config.encryption_key);
    let calendar_client = GoogleCalendarClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );
    let calendar_service = GoogleCalendarService::new(calendar_client, cipher);
    let calendar_sync = CalendarSyncService::new(calendar_service, db.clone());
    let chat_service = ChatService::new(config.gemini_api_key.clone());

    let state = Arc::new(AppState {
        config,
        db,
        calendar_sync,
        chat_service,
    });

    (altheia_backend::routes::create_router(state.clone()), state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake Google Calendar API
// ─────────────────────────────────────────────────────────────────────────────

/// One stored event on the fake server.
pub struct StoredEvent {
    pub id: String,
    pub log_id: String,
    pub payload: Value,
}

/// Shared, inspectable state behind the fake server.
#[derive(Default)]
pub struct FakeGoogleState {
    pub events: Mutex<Vec<StoredEvent>>,
    pub calendars: Mutex<Vec<(String, String)>>,
    counter: AtomicU64,
    /// Event insert/update fails (503) for logs with these correlation ids
    pub fail_sync_log_ids: Mutex<HashSet<String>>,
    /// Event listing fails (500) when filtered by these correlation ids
    pub fail_lookup_log_ids: Mutex<HashSet<String>>,
    /// Token refresh responds with invalid_grant
    pub refresh_fails: AtomicBool,
    /// Revocation responds with 500
    pub revoke_fails: AtomicBool,
    /// Number of DELETE calls received
    pub delete_calls: AtomicU64,
    /// Total requests received (any endpoint)
    pub requests: AtomicU64,
}

impl FakeGoogleState {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-process fake of the Google Calendar + OAuth endpoints.
pub struct FakeGoogle {
    pub base_url: String,
    pub state: Arc<FakeGoogleState>,
}

impl FakeGoogle {
    /// Bind on an ephemeral port and serve the fake API.
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeGoogleState::default());

        let router = Router::new()
            .route("/token", post(token))
            .route("/revoke", post(revoke))
            .route("/users/me/calendarList", get(list_calendars))
            .route("/calendars", post(insert_calendar))
            .route(
                "/calendars/{calendar_id}/events",
                get(list_events).post(insert_event),
            )
            .route(
                "/calendars/{calendar_id}/events/{event_id}",
                put(update_event).delete(delete_event),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Google server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Calendar service wired against this fake server.
    pub fn calendar_service(&self) -> GoogleCalendarService {
        let client = GoogleCalendarClient::with_endpoints(
            "test_client_id".to_string(),
            "test_secret".to_string(),
            self.base_url.clone(),
            format!("{}/token", self.base_url),
            format!("{}/revoke", self.base_url),
        );
        GoogleCalendarService::new(client, SecretCipher::new(TEST_CIPHER_KEY))
    }

    /// Sync orchestrator wired against this fake server and the given db.
    pub fn sync_service(&self, db: FirestoreDb) -> CalendarSyncService {
        CalendarSyncService::new(self.calendar_service(), db)
    }

    /// An encrypted refresh token the fake server will accept.
    pub fn encrypted_refresh_token(&self) -> String {
        SecretCipher::new(TEST_CIPHER_KEY)
            .encrypt("fake-refresh-token")
            .unwrap()
    }

    pub fn event_count(&self) -> usize {
        self.state.events.lock().unwrap().len()
    }

    /// Event ids currently stored for a log's correlation tag.
    pub fn event_ids_for_log(&self, log_id: &str) -> Vec<String> {
        self.state
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.log_id == log_id)
            .map(|e| e.id.clone())
            .collect()
    }
}

fn correlation_tag(payload: &Value) -> String {
    payload["extendedProperties"]["private"]["altheia_log_id"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

async fn token(State(state): State<Arc<FakeGoogleState>>) -> Response {
    state.hit();
    if state.refresh_fails.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": "fake-access-token",
        "refresh_token": "fake-refresh-token",
        "expires_in": 3600
    }))
    .into_response()
}

async fn revoke(State(state): State<Arc<FakeGoogleState>>) -> Response {
    state.hit();
    if state.revoke_fails.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::OK.into_response()
}

async fn list_calendars(State(state): State<Arc<FakeGoogleState>>) -> Response {
    state.hit();
    let items: Vec<Value> = state
        .calendars
        .lock()
        .unwrap()
        .iter()
        .map(|(id, summary)| json!({"id": id, "summary": summary}))
        .collect();
    Json(json!({"items": items})).into_response()
}

async fn insert_calendar(
    State(state): State<Arc<FakeGoogleState>>,
    Json(payload): Json<Value>,
) -> Response {
    state.hit();
    let id = state.next_id("cal");
    let summary = payload["summary"].as_str().unwrap_or_default().to_string();
    state
        .calendars
        .lock()
        .unwrap()
        .push((id.clone(), summary.clone()));
    Json(json!({"id": id, "summary": summary})).into_response()
}

async fn list_events(
    State(state): State<Arc<FakeGoogleState>>,
    Path(_calendar_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit();

    let filter = params
        .get("privateExtendedProperty")
        .and_then(|v| v.split_once('='))
        .map(|(_, log_id)| log_id.to_string());

    if let Some(log_id) = &filter {
        if state.fail_lookup_log_ids.lock().unwrap().contains(log_id) {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let items: Vec<Value> = state
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| filter.as_deref().map_or(true, |log_id| e.log_id == log_id))
        .map(|e| json!({"id": e.id}))
        .collect();

    Json(json!({"items": items})).into_response()
}

async fn insert_event(
    State(state): State<Arc<FakeGoogleState>>,
    Path(_calendar_id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    state.hit();

    let log_id = correlation_tag(&payload);
    if state.fail_sync_log_ids.lock().unwrap().contains(&log_id) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let id = state.next_id("ev");
    state.events.lock().unwrap().push(StoredEvent {
        id: id.clone(),
        log_id,
        payload,
    });

    Json(json!({"id": id})).into_response()
}

async fn update_event(
    State(state): State<Arc<FakeGoogleState>>,
    Path((_calendar_id, event_id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Response {
    state.hit();

    let log_id = correlation_tag(&payload);
    if state.fail_sync_log_ids.lock().unwrap().contains(&log_id) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let mut events = state.events.lock().unwrap();
    match events.iter_mut().find(|e| e.id == event_id) {
        Some(event) => {
            event.payload = payload;
            event.log_id = log_id;
            Json(json!({"id": event_id})).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_event(
    State(state): State<Arc<FakeGoogleState>>,
    Path((_calendar_id, event_id)): Path<(String, String)>,
) -> Response {
    state.hit();
    state.delete_calls.fetch_add(1, Ordering::SeqCst);

    let mut events = state.events.lock().unwrap();
    let before = events.len();
    events.retain(|e| e.id != event_id);

    if events.len() == before {
        StatusCode::NOT_FOUND.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
