// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar API client for event synchronization.
//!
//! Handles:
//! - OAuth code exchange, token refresh, and revocation
//! - Calendar provisioning ("Altheia Health")
//! - Event create/update/delete and correlation-tag lookup
//! - Formatting symptom logs into all-day calendar events

use crate::error::AppError;
use crate::models::{SymptomItem, SymptomLog};
use crate::services::cipher::SecretCipher;
use serde::{Deserialize, Serialize};

/// OAuth scope requested at consent time (event read/write only).
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// Summary of the dedicated calendar provisioned per user.
pub const CALENDAR_SUMMARY: &str = "Altheia Health";

const CALENDAR_DESCRIPTION: &str = "Symptom logs from Altheia health tracking app";

/// Private extended property tying an event back to exactly one log record.
pub const LOG_ID_PROPERTY: &str = "altheia_log_id";

/// Private extended property distinguishing our events from user-created ones.
const SOURCE_PROPERTY: &str = "altheia_app";

/// Raw Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    revoke_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendarClient {
    /// Create a new client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            "https://www.googleapis.com/calendar/v3".to_string(),
            "https://oauth2.googleapis.com/token".to_string(),
            "https://oauth2.googleapis.com/revoke".to_string(),
        )
    }

    /// Create a client against alternate endpoints (used by tests).
    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        base_url: String,
        token_url: String,
        revoke_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token_url,
            revoke_url,
            client_id,
            client_secret,
        }
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeExchangeResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Token exchange failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Revoke a token (access or refresh) with Google.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(format!("Revocation request failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!("Google token revocation successful");
        Ok(())
    }

    // ─── Calendars ───────────────────────────────────────────────────────────

    /// List the user's calendars.
    pub async fn list_calendars(
        &self,
        access_token: &str,
    ) -> Result<Vec<CalendarResource>, AppError> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let list: CalendarListResponse = self.get_json(&url, access_token).await?;
        Ok(list.items)
    }

    /// Create a new secondary calendar.
    pub async fn insert_calendar(
        &self,
        access_token: &str,
        calendar: &CalendarPayload,
    ) -> Result<CalendarResource, AppError> {
        let url = format!("{}/calendars", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(calendar)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    /// Create an event, returning the server-assigned event id.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<EventResource, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Replace an existing event.
    pub async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &EventPayload,
    ) -> Result<EventResource, AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Delete an event. An already-deleted event is not an error.
    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        // Gone or never existed: the desired state already holds
        if matches!(response.status().as_u16(), 404 | 410) {
            tracing::warn!(event_id, "Event already absent on delete");
            return Ok(());
        }

        self.check_response(response).await
    }

    /// List events carrying a private extended property `key=value`.
    pub async fn list_events_by_private_property(
        &self,
        access_token: &str,
        calendar_id: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<EventResource>, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("privateExtendedProperty", format!("{}={}", key, value))])
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        let list: EventsListResponse = self.check_response_json(response).await?;
        Ok(list.items)
    }

    // ─── Response Helpers ────────────────────────────────────────────────────

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 {
            return Err(AppError::InvalidCredentials);
        }

        if status.as_u16() == 429 {
            tracing::warn!("Google Calendar rate limit hit (429)");
        }

        Err(AppError::CalendarApi(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(AppError::InvalidCredentials);
            }

            if status.as_u16() == 429 {
                tracing::warn!("Google Calendar rate limit hit (429)");
            }

            return Err(AppError::CalendarApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::CalendarApi(format!("JSON parse error: {}", e)))
    }
}

// ─── API Types ───────────────────────────────────────────────────────────────

/// Token refresh response from Google OAuth.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Authorization-code exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeExchangeResponse {
    pub access_token: String,
    /// Only present when the consent screen was shown with offline access
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// Calendar metadata for provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarPayload {
    pub summary: String,
    pub description: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

/// Calendar resource as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarResource {
    pub id: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarResource>,
}

/// All-day event payload sent to the Calendar API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDate,
    pub end: EventDate,
    #[serde(rename = "colorId")]
    pub color_id: String,
    #[serde(rename = "extendedProperties")]
    pub extended_properties: ExtendedProperties,
}

/// Date component of an all-day event (start == end).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDate {
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    pub private: PrivateProperties,
}

/// Private metadata invisible to other calendar clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateProperties {
    pub altheia_log_id: String,
    pub source: String,
}

/// Event resource as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct EventResource {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    #[serde(default)]
    items: Vec<EventResource>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Severity classification and event formatting (pure)
// ─────────────────────────────────────────────────────────────────────────────

/// Overall severity of a day's symptoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Display label used in event summaries.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }

    /// Google Calendar color id (mild = green, moderate = yellow, severe = red).
    pub fn color_id(self) -> &'static str {
        match self {
            Severity::Mild => "2",
            Severity::Moderate => "5",
            Severity::Severe => "11",
        }
    }
}

/// Classify overall severity from individual symptom ratings.
///
/// Average of the 1-5 ratings: >= 4 is severe, >= 2.5 moderate, else mild.
/// An empty list classifies as mild.
pub fn classify_severity(symptoms: &[SymptomItem]) -> Severity {
    if symptoms.is_empty() {
        return Severity::Mild;
    }

    let total: u32 = symptoms.iter().map(|s| s.severity as u32).sum();
    let average = total as f64 / symptoms.len() as f64;

    if average >= 4.0 {
        Severity::Severe
    } else if average >= 2.5 {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Format a symptom log into a calendar event payload.
///
/// Deterministic for any log with a parseable date; an unparseable date
/// falls back to today (UTC).
pub fn format_event(log: &SymptomLog) -> EventPayload {
    let severity = classify_severity(&log.symptoms);

    let mut description_parts = vec!["Symptoms:".to_string()];
    for symptom in &log.symptoms {
        description_parts.push(format!("- {}: {}/5", symptom.name, symptom.severity));
    }
    if let Some(notes) = log.overall_notes.as_deref().filter(|n| !n.is_empty()) {
        description_parts.push(format!("\nNotes: {}", notes));
    }

    let date = normalize_event_date(&log.date);

    EventPayload {
        summary: format!("Symptom Log: {}", severity.label()),
        description: description_parts.join("\n"),
        start: EventDate { date: date.clone() },
        end: EventDate { date },
        color_id: severity.color_id().to_string(),
        extended_properties: ExtendedProperties {
            private: PrivateProperties {
                altheia_log_id: log.id.clone(),
                source: SOURCE_PROPERTY.to_string(),
            },
        },
    }
}

/// Normalize a log date to `YYYY-MM-DD` for an all-day event.
///
/// Accepts a plain `YYYY-MM-DD` or an RFC3339 timestamp. Anything else
/// falls back to today (UTC); the log store validates dates at write time,
/// so this branch should not be reachable for stored logs.
fn normalize_event_date(raw: &str) -> String {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }

    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(raw) {
        return datetime.date_naive().format("%Y-%m-%d").to_string();
    }

    crate::time_utils::today_utc_date()
}

// ─────────────────────────────────────────────────────────────────────────────
// GoogleCalendarService - credential resolution and calendar operations
// ─────────────────────────────────────────────────────────────────────────────

/// Live, short-lived access credentials resolved from a stored refresh token.
///
/// Exists only within a single request scope. The decrypted refresh token is
/// dropped as soon as the refresh round-trip completes and is never logged.
#[derive(Clone)]
pub struct AccessCredentials {
    access_token: String,
}

impl AccessCredentials {
    pub fn token(&self) -> &str {
        &self.access_token
    }

    /// Build credentials directly from an access token (OAuth callback path,
    /// where Google just handed us a fresh token).
    pub fn from_access_token(access_token: String) -> Self {
        Self { access_token }
    }
}

/// High-level Google Calendar service: resolves credentials and wraps the
/// event/calendar operations the sync orchestrator needs.
#[derive(Clone)]
pub struct GoogleCalendarService {
    client: GoogleCalendarClient,
    cipher: SecretCipher,
}

impl GoogleCalendarService {
    pub fn new(client: GoogleCalendarClient, cipher: SecretCipher) -> Self {
        Self { client, cipher }
    }

    /// Access to the raw client (OAuth flows in the routes layer).
    pub fn client(&self) -> &GoogleCalendarClient {
        &self.client
    }

    /// Encrypt a refresh token for storage.
    pub fn encrypt_refresh_token(&self, refresh_token: &str) -> Result<String, AppError> {
        self.cipher.encrypt(refresh_token)
    }

    // ─── Credential Resolution ───────────────────────────────────────────────

    /// Resolve stored encrypted credentials into a live access token.
    ///
    /// Decrypts the refresh token and performs a refresh round-trip. This is
    /// the single place the durable secret exists in plaintext; it never
    /// leaves this function.
    pub async fn resolve_credentials(
        &self,
        encrypted_refresh_token: &str,
    ) -> Result<AccessCredentials, AppError> {
        let refresh_token = self.cipher.decrypt(encrypted_refresh_token)?;

        let refreshed = match self.client.refresh_token(&refresh_token).await {
            Ok(r) => r,
            Err(AppError::InvalidCredentials) => return Err(AppError::InvalidCredentials),
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed");
                return Err(AppError::InvalidCredentials);
            }
        };

        Ok(AccessCredentials {
            access_token: refreshed.access_token,
        })
    }

    /// Best-effort revocation of the stored durable secret with Google.
    pub async fn revoke_link(&self, encrypted_refresh_token: &str) -> Result<(), AppError> {
        let refresh_token = self.cipher.decrypt(encrypted_refresh_token)?;
        self.client.revoke_token(&refresh_token).await
    }

    // ─── Calendar Provisioning ───────────────────────────────────────────────

    /// Ensure the dedicated "Altheia Health" calendar exists.
    ///
    /// Idempotent: returns the id of an existing calendar with the fixed
    /// summary, creating one only if absent.
    pub async fn ensure_calendar(&self, creds: &AccessCredentials) -> Result<String, AppError> {
        let calendars = self.client.list_calendars(creds.token()).await?;

        if let Some(existing) = calendars.iter().find(|c| c.summary == CALENDAR_SUMMARY) {
            tracing::info!(calendar_id = %existing.id, "Found existing Altheia Health calendar");
            return Ok(existing.id.clone());
        }

        let created = self
            .client
            .insert_calendar(
                creds.token(),
                &CalendarPayload {
                    summary: CALENDAR_SUMMARY.to_string(),
                    description: CALENDAR_DESCRIPTION.to_string(),
                    time_zone: "UTC".to_string(),
                },
            )
            .await?;

        tracing::info!(calendar_id = %created.id, "Created new Altheia Health calendar");
        Ok(created.id)
    }

    // ─── Event Operations ────────────────────────────────────────────────────

    /// Find the event mirroring a log record, by correlation tag.
    ///
    /// Lookup failures are logged and treated as "not found" so that a flaky
    /// list call never blocks a subsequent create attempt.
    pub async fn find_event_by_log_id(
        &self,
        creds: &AccessCredentials,
        calendar_id: &str,
        log_id: &str,
    ) -> Option<String> {
        match self
            .client
            .list_events_by_private_property(creds.token(), calendar_id, LOG_ID_PROPERTY, log_id)
            .await
        {
            Ok(events) => events.into_iter().next().map(|e| e.id),
            Err(e) => {
                tracing::error!(log_id, error = %e, "Failed to look up event for log");
                None
            }
        }
    }

    /// Create or update the calendar event for a symptom log.
    ///
    /// Updates when an event id is supplied, creates otherwise. Returns the
    /// resulting event id.
    pub async fn sync_event(
        &self,
        creds: &AccessCredentials,
        calendar_id: &str,
        log: &SymptomLog,
        event_id: Option<&str>,
    ) -> Result<String, AppError> {
        let payload = format_event(log);

        match event_id {
            Some(event_id) => {
                let updated = self
                    .client
                    .update_event(creds.token(), calendar_id, event_id, &payload)
                    .await?;
                tracing::info!(event_id = %updated.id, "Updated calendar event");
                Ok(updated.id)
            }
            None => {
                let created = self
                    .client
                    .insert_event(creds.token(), calendar_id, &payload)
                    .await?;
                tracing::info!(event_id = %created.id, "Created calendar event");
                Ok(created.id)
            }
        }
    }

    /// Delete a calendar event. Absent events count as deleted.
    pub async fn delete_event(
        &self,
        creds: &AccessCredentials,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        self.client
            .delete_event(creds.token(), calendar_id, event_id)
            .await?;
        tracing::info!(event_id, "Deleted calendar event");
        Ok(())
    }
}
