// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar sync orchestration.
//!
//! Handles the core workflow for every sync operation:
//! 1. Verify the link preconditions (connected + sync enabled)
//! 2. Resolve live credentials from the stored refresh token
//! 3. Look up the mirrored event by correlation tag
//! 4. Create, update, or delete the remote event
//! 5. Stamp last_sync on success
//!
//! The symptom log is always the source of truth; the remote event is a
//! best-effort mirror re-derived from the log on every sync.

use std::collections::HashMap;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{GoogleAuthData, SymptomLog, User};
use crate::services::google_calendar::{AccessCredentials, GoogleCalendarService};
use crate::time_utils::format_utc_rfc3339;
use serde::Serialize;

/// Link state of a user verified ready for sync operations.
pub struct VerifiedLink<'a> {
    pub encrypted_refresh_token: &'a str,
    pub calendar_id: Option<&'a str>,
}

/// Check the sync preconditions without touching credentials or the network.
///
/// Fails with `NotConnected` when no refresh token is stored, and with
/// `SyncDisabled` when the link exists but sync is switched off.
pub fn verify_sync_ready(user: &User) -> Result<VerifiedLink<'_>> {
    let auth = user
        .google_auth
        .as_ref()
        .filter(|a| !a.encrypted_refresh_token.is_empty())
        .ok_or(AppError::NotConnected)?;

    if !user.calendar_settings.is_enabled {
        return Err(AppError::SyncDisabled);
    }

    Ok(VerifiedLink {
        encrypted_refresh_token: &auth.encrypted_refresh_token,
        calendar_id: user.calendar_settings.calendar_id.as_deref(),
    })
}

/// Result of a batch sync: per-log event ids plus the failure count.
#[derive(Debug, Default)]
pub struct BatchSyncOutcome {
    /// Successfully synced log ids mapped to their event ids
    pub event_map: HashMap<String, String>,
    /// Number of logs whose sync failed
    pub failed_count: usize,
}

impl BatchSyncOutcome {
    pub fn synced_count(&self) -> usize {
        self.event_map.len()
    }
}

/// Calendar connection status reported to the client.
#[derive(Debug, Serialize)]
pub struct CalendarStatus {
    pub connected: bool,
    pub sync_enabled: bool,
    pub calendar_id: Option<String>,
    pub last_sync: Option<String>,
}

/// Orchestrates symptom-log synchronization with Google Calendar.
#[derive(Clone)]
pub struct CalendarSyncService {
    calendar: GoogleCalendarService,
    db: FirestoreDb,
}

impl CalendarSyncService {
    pub fn new(calendar: GoogleCalendarService, db: FirestoreDb) -> Self {
        Self { calendar, db }
    }

    /// Access to the calendar service (OAuth URL building in routes).
    pub fn calendar(&self) -> &GoogleCalendarService {
        &self.calendar
    }

    // ─── Connection Lifecycle ────────────────────────────────────────────────

    /// Complete the OAuth handshake: exchange the authorization code, encrypt
    /// and store the refresh token, and provision the dedicated calendar.
    pub async fn complete_connection(
        &self,
        user_id: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<()> {
        let exchange = self.calendar.client().exchange_code(code, redirect_uri).await?;

        let refresh_token = exchange.refresh_token.ok_or_else(|| {
            AppError::BadRequest(
                "No refresh token received. Please revoke access and try again.".to_string(),
            )
        })?;

        let encrypted = self.calendar.encrypt_refresh_token(&refresh_token)?;

        // Google just handed us a fresh access token; use it directly for
        // provisioning instead of an immediate refresh round-trip.
        let creds = AccessCredentials::from_access_token(exchange.access_token);
        let calendar_id = self.calendar.ensure_calendar(&creds).await?;

        self.db
            .set_google_link(
                user_id,
                GoogleAuthData {
                    encrypted_refresh_token: encrypted,
                    token_created_at: format_utc_rfc3339(chrono::Utc::now()),
                },
                &calendar_id,
            )
            .await?;

        tracing::info!(user_id, calendar_id = %calendar_id, "Google Calendar connected");
        Ok(())
    }

    /// Disconnect Google Calendar.
    ///
    /// Revocation with Google is best-effort: its failure is logged and
    /// swallowed, and local link state is cleared regardless, so a disconnect
    /// request always succeeds locally.
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        let user = self.db.require_user(user_id).await?;
        let auth = user.google_auth.as_ref().ok_or(AppError::NotConnected)?;

        match self.calendar.revoke_link(&auth.encrypted_refresh_token).await {
            Ok(()) => tracing::info!(user_id, "Revoked Google Calendar access"),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to revoke token (may already be revoked)")
            }
        }

        self.db.clear_google_link(user_id).await?;
        tracing::info!(user_id, "Google Calendar disconnected");
        Ok(())
    }

    /// Enable or disable calendar sync. Requires a connected calendar.
    pub async fn set_sync_enabled(&self, user_id: &str, enabled: bool) -> Result<()> {
        let user = self.db.require_user(user_id).await?;
        if !user.calendar_connected() {
            return Err(AppError::NotConnected);
        }

        self.db.set_sync_enabled(user_id, enabled).await?;
        tracing::info!(user_id, enabled, "Calendar sync toggled");
        Ok(())
    }

    /// Report connection and sync status.
    pub async fn status(&self, user_id: &str) -> Result<CalendarStatus> {
        let user = self.db.require_user(user_id).await?;
        let connected = user.calendar_connected();

        Ok(CalendarStatus {
            connected,
            sync_enabled: connected && user.calendar_settings.is_enabled,
            calendar_id: if connected {
                user.calendar_settings.calendar_id
            } else {
                None
            },
            last_sync: if connected {
                user.calendar_settings.last_sync
            } else {
                None
            },
        })
    }

    // ─── Sync Operations ─────────────────────────────────────────────────────

    /// Sync a single symptom log, creating or updating its calendar event.
    ///
    /// Returns the event id. Idempotent: a second sync with an unchanged log
    /// takes the update path and leaves exactly one event for the log.
    pub async fn sync_one(&self, user_id: &str, log_id: &str) -> Result<String> {
        let user = self.db.require_user(user_id).await?;
        let link = verify_sync_ready(&user)?;

        let log = self
            .db
            .get_log(log_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Symptom log {}", log_id)))?;

        let creds = self
            .calendar
            .resolve_credentials(link.encrypted_refresh_token)
            .await?;
        let calendar_id = self.ensure_calendar_id(user_id, &creds, &link).await?;

        let existing = self
            .calendar
            .find_event_by_log_id(&creds, &calendar_id, &log.id)
            .await;
        let event_id = self
            .calendar
            .sync_event(&creds, &calendar_id, &log, existing.as_deref())
            .await?;

        self.db
            .set_last_sync(user_id, &format_utc_rfc3339(chrono::Utc::now()))
            .await?;

        tracing::info!(user_id, log_id, event_id = %event_id, "Synced symptom log");
        Ok(event_id)
    }

    /// Sync all of a user's symptom logs.
    ///
    /// Preconditions are checked once and credentials resolved once; each
    /// log then syncs independently, with failures isolated per item.
    pub async fn sync_all(&self, user_id: &str) -> Result<BatchSyncOutcome> {
        let user = self.db.require_user(user_id).await?;
        let link = verify_sync_ready(&user)?;

        let logs = self.db.get_all_logs(user_id).await?;
        if logs.is_empty() {
            return Ok(BatchSyncOutcome::default());
        }

        let creds = self
            .calendar
            .resolve_credentials(link.encrypted_refresh_token)
            .await?;
        let calendar_id = self.ensure_calendar_id(user_id, &creds, &link).await?;

        let outcome = self.sync_batch(&creds, &calendar_id, &logs).await;

        if outcome.synced_count() > 0 {
            self.db
                .set_last_sync(user_id, &format_utc_rfc3339(chrono::Utc::now()))
                .await?;
        }

        tracing::info!(
            user_id,
            synced = outcome.synced_count(),
            failed = outcome.failed_count,
            "Batch sync completed"
        );
        Ok(outcome)
    }

    /// Sync a batch of logs with per-item failure isolation.
    ///
    /// Each log goes through the same find-then-create-or-update path as a
    /// single sync, so re-running a full sync never duplicates events. A
    /// failing log increments the failure count and never aborts the rest.
    pub async fn sync_batch(
        &self,
        creds: &AccessCredentials,
        calendar_id: &str,
        logs: &[SymptomLog],
    ) -> BatchSyncOutcome {
        let mut outcome = BatchSyncOutcome::default();

        for log in logs {
            let existing = self
                .calendar
                .find_event_by_log_id(creds, calendar_id, &log.id)
                .await;

            match self
                .calendar
                .sync_event(creds, calendar_id, log, existing.as_deref())
                .await
            {
                Ok(event_id) => {
                    outcome.event_map.insert(log.id.clone(), event_id);
                }
                Err(e) => {
                    tracing::error!(log_id = %log.id, error = %e, "Failed to sync log");
                    outcome.failed_count += 1;
                }
            }
        }

        outcome
    }

    /// Remove the calendar event mirroring a log.
    ///
    /// The symptom log itself is never touched; only the remote event goes
    /// away. Fails with `NotFound` when no event exists for the log.
    pub async fn delete_sync(&self, user_id: &str, log_id: &str) -> Result<String> {
        let user = self.db.require_user(user_id).await?;
        let link = verify_sync_ready(&user)?;

        let creds = self
            .calendar
            .resolve_credentials(link.encrypted_refresh_token)
            .await?;

        let calendar_id = link
            .calendar_id
            .ok_or_else(|| AppError::NotFound("Calendar event not found for this log".to_string()))?;

        let event_id = self.delete_for_log(&creds, calendar_id, log_id).await?;

        tracing::info!(user_id, log_id, event_id = %event_id, "Deleted synced event");
        Ok(event_id)
    }

    /// Find and delete the event mirroring a log.
    ///
    /// Fails with `NotFound` before issuing any delete call when no event
    /// carries the log's correlation tag.
    pub async fn delete_for_log(
        &self,
        creds: &AccessCredentials,
        calendar_id: &str,
        log_id: &str,
    ) -> Result<String> {
        let event_id = self
            .calendar
            .find_event_by_log_id(creds, calendar_id, log_id)
            .await
            .ok_or_else(|| {
                AppError::NotFound("Calendar event not found for this log".to_string())
            })?;

        self.calendar
            .delete_event(creds, calendar_id, &event_id)
            .await?;

        Ok(event_id)
    }

    /// Return the provisioned calendar id, provisioning one if the link
    /// predates calendar provisioning.
    async fn ensure_calendar_id(
        &self,
        user_id: &str,
        creds: &AccessCredentials,
        link: &VerifiedLink<'_>,
    ) -> Result<String> {
        if let Some(calendar_id) = link.calendar_id {
            return Ok(calendar_id.to_string());
        }

        let calendar_id = self.calendar.ensure_calendar(creds).await?;
        self.db.set_calendar_id(user_id, &calendar_id).await?;
        Ok(calendar_id)
    }
}
