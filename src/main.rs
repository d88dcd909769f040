// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Altheia API Server
//!
//! Backend for the Altheia health tracking app: symptom logging, article
//! listing, a chatbot proxy, and Google Calendar synchronization.

use altheia_backend::{
    config::Config,
    db::FirestoreDb,
    services::{
        CalendarSyncService, ChatService, GoogleCalendarClient, GoogleCalendarService,
        SecretCipher,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, env = %config.app_env, "Starting Altheia API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Token cipher (AES-256-GCM key loaded once from config)
    let cipher = SecretCipher::new(config.encryption_key);

    // Google Calendar sync stack
    let calendar_client = GoogleCalendarClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );
    let calendar_service = GoogleCalendarService::new(calendar_client, cipher);
    let calendar_sync = CalendarSyncService::new(calendar_service, db.clone());
    tracing::info!("Google Calendar service initialized");

    // Gemini chat proxy
    let chat_service = ChatService::new(config.gemini_api_key.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        calendar_sync,
        chat_service,
    });

    // Build router
    let app = altheia_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("altheia_backend=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
