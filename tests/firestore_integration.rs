// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). The emulator provides a clean state for
//! each test run.

use altheia_backend::models::{CalendarSettings, SymptomItem, SymptomLogInput, User};

mod common;
use common::test_db;

/// Generate a unique id for test isolation.
fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// Helper to create a basic test user.
fn test_user(user_id: &str) -> User {
    User {
        id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        name: "Test User".to_string(),
        password_hash: "100000$c2FsdA==$aGFzaA==".to_string(),
        age_range: Some("45-54".to_string()),
        menstrual_status: Some("perimenopause".to_string()),
        primary_symptoms: vec!["hot_flushes".to_string()],
        onboarding_completed: true,
        google_auth: None,
        calendar_settings: CalendarSettings::default(),
        created_at: "2024-01-15T10:00:00Z".to_string(),
        updated_at: "2024-01-15T10:00:00Z".to_string(),
    }
}

fn log_input(date: &str, severity: u8) -> SymptomLogInput {
    SymptomLogInput {
        date: date.to_string(),
        symptoms: vec![SymptomItem {
            name: "Hot Flushes".to_string(),
            severity,
            notes: None,
        }],
        overall_notes: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_creation_and_email_lookup() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    let before = db.get_user(&user_id).await.unwrap();
    assert!(before.is_none(), "User should not exist before creation");

    let user = test_user(&user_id);
    db.upsert_user(&user).await.unwrap();

    let fetched = db.get_user(&user_id).await.unwrap().expect("user exists");
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.name, "Test User");
    assert!(!fetched.calendar_connected());

    let by_email = db
        .get_user_by_email(&user.email)
        .await
        .unwrap()
        .expect("email lookup should find the user");
    assert_eq!(by_email.id, user_id);

    let missing = db
        .get_user_by_email("nobody@example.com")
        .await
        .unwrap();
    assert!(missing.is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// SYMPTOM LOG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_upsert_log_keeps_identity_per_date() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    let first = db
        .upsert_log(&user_id, &log_input("2024-03-01", 2))
        .await
        .unwrap();

    // Second submit for the same date updates in place
    let mut updated_input = log_input("2024-03-01", 5);
    updated_input.overall_notes = Some("worse today".to_string());
    let second = db.upsert_log(&user_id, &updated_input).await.unwrap();

    assert_eq!(first.id, second.id, "log identity is stable per (user, date)");
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.symptoms[0].severity, 5);
    assert_eq!(second.overall_notes.as_deref(), Some("worse today"));

    // Still exactly one log for that date
    let logs = db
        .list_logs(&user_id, Some("2024-03-01"), Some("2024-03-01"))
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn test_get_log_is_owner_scoped() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_id("owner");
    let intruder = unique_id("intruder");

    let log = db
        .upsert_log(&owner, &log_input("2024-03-02", 3))
        .await
        .unwrap();

    let as_owner = db.get_log(&log.id, &owner).await.unwrap();
    assert!(as_owner.is_some());

    let as_intruder = db.get_log(&log.id, &intruder).await.unwrap();
    assert!(as_intruder.is_none(), "other users must not see the log");
}

#[tokio::test]
async fn test_list_logs_range_and_order() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    for date in ["2024-04-01", "2024-04-02", "2024-04-03", "2024-04-10"] {
        db.upsert_log(&user_id, &log_input(date, 3)).await.unwrap();
    }

    let in_range = db
        .list_logs(&user_id, Some("2024-04-01"), Some("2024-04-03"))
        .await
        .unwrap();
    assert_eq!(in_range.len(), 3);

    // Newest first
    let dates: Vec<&str> = in_range.iter().map(|l| l.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-04-03", "2024-04-02", "2024-04-01"]);

    let open_ended = db
        .list_logs(&user_id, Some("2024-04-03"), None)
        .await
        .unwrap();
    assert_eq!(open_ended.len(), 2);
}

#[tokio::test]
async fn test_delete_log_by_date() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    db.upsert_log(&user_id, &log_input("2024-05-01", 2))
        .await
        .unwrap();

    let deleted = db.delete_log_by_date(&user_id, "2024-05-01").await.unwrap();
    assert!(deleted);

    let gone = db.get_log_by_date(&user_id, "2024-05-01").await.unwrap();
    assert!(gone.is_none());

    // Deleting again reports nothing to delete
    let again = db.delete_log_by_date(&user_id, "2024-05-01").await.unwrap();
    assert!(!again);
}

// ═══════════════════════════════════════════════════════════════════════════
// LINK STATE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_link_state_patches() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");
    db.upsert_user(&test_user(&user_id)).await.unwrap();

    db.set_google_link(
        &user_id,
        altheia_backend::models::GoogleAuthData {
            encrypted_refresh_token: "ciphertext".to_string(),
            token_created_at: "2024-01-15T10:00:00Z".to_string(),
        },
        "cal-abc",
    )
    .await
    .unwrap();

    let linked = db.get_user(&user_id).await.unwrap().unwrap();
    assert!(linked.calendar_connected());
    assert!(linked.calendar_settings.is_enabled);
    assert_eq!(linked.calendar_settings.calendar_id.as_deref(), Some("cal-abc"));

    db.set_sync_enabled(&user_id, false).await.unwrap();
    db.set_last_sync(&user_id, "2024-01-16T09:00:00Z").await.unwrap();

    let toggled = db.get_user(&user_id).await.unwrap().unwrap();
    assert!(!toggled.calendar_settings.is_enabled);
    assert_eq!(
        toggled.calendar_settings.last_sync.as_deref(),
        Some("2024-01-16T09:00:00Z")
    );

    db.clear_google_link(&user_id).await.unwrap();
    let cleared = db.get_user(&user_id).await.unwrap().unwrap();
    assert!(!cleared.calendar_connected());
    assert!(cleared.calendar_settings.calendar_id.is_none());
    assert!(cleared.calendar_settings.last_sync.is_none());
}
