// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, encrypted Google credentials, calendar link state)
//! - Symptom logs (one per user per day, upserted by date)
//! - Articles (read-only listing)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Article, GoogleAuthData, SymptomLog, SymptomLogInput, User};
use crate::time_utils::format_utc_rfc3339;

/// Default number of logs returned when no date range is given.
const DEFAULT_LOG_LIMIT: u32 = 30;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by email address (login lookup).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Create or update a user document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch a user or fail with NotFound.
    pub async fn require_user(&self, user_id: &str) -> Result<User, AppError> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
    }

    // ─── Calendar Link State ─────────────────────────────────────

    /// Store Google credentials and the provisioned calendar after a
    /// successful OAuth handshake. Sync starts enabled.
    pub async fn set_google_link(
        &self,
        user_id: &str,
        google_auth: GoogleAuthData,
        calendar_id: &str,
    ) -> Result<(), AppError> {
        let mut user = self.require_user(user_id).await?;
        user.google_auth = Some(google_auth);
        user.calendar_settings.calendar_id = Some(calendar_id.to_string());
        user.calendar_settings.is_enabled = true;
        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.upsert_user(&user).await
    }

    /// Clear all Google Calendar link state (disconnect).
    pub async fn clear_google_link(&self, user_id: &str) -> Result<(), AppError> {
        let mut user = self.require_user(user_id).await?;
        user.google_auth = None;
        user.calendar_settings.is_enabled = false;
        user.calendar_settings.calendar_id = None;
        user.calendar_settings.last_sync = None;
        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.upsert_user(&user).await
    }

    /// Enable or disable calendar sync.
    pub async fn set_sync_enabled(&self, user_id: &str, enabled: bool) -> Result<(), AppError> {
        let mut user = self.require_user(user_id).await?;
        user.calendar_settings.is_enabled = enabled;
        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.upsert_user(&user).await
    }

    /// Stamp the last successful sync time.
    pub async fn set_last_sync(&self, user_id: &str, timestamp: &str) -> Result<(), AppError> {
        let mut user = self.require_user(user_id).await?;
        user.calendar_settings.last_sync = Some(timestamp.to_string());
        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.upsert_user(&user).await
    }

    /// Store the provisioned calendar id.
    pub async fn set_calendar_id(&self, user_id: &str, calendar_id: &str) -> Result<(), AppError> {
        let mut user = self.require_user(user_id).await?;
        user.calendar_settings.calendar_id = Some(calendar_id.to_string());
        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.upsert_user(&user).await
    }

    // ─── Symptom Log Operations ──────────────────────────────────

    /// Get a log by ID, scoped to its owner.
    ///
    /// Returns None when the log does not exist or belongs to another user.
    pub async fn get_log(
        &self,
        log_id: &str,
        user_id: &str,
    ) -> Result<Option<SymptomLog>, AppError> {
        let log: Option<SymptomLog> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SYMPTOM_LOGS)
            .obj()
            .one(log_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(log.filter(|l| l.user_id == user_id))
    }

    /// Get a user's log for a specific date.
    pub async fn get_log_by_date(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<SymptomLog>, AppError> {
        let user_id = user_id.to_string();
        let date = date.to_string();
        let mut logs: Vec<SymptomLog> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SYMPTOM_LOGS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("date").eq(date.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(logs.pop())
    }

    /// Create or update the log for `(user, date)`.
    ///
    /// A log's identity is stable once created; re-submitting the same date
    /// overwrites symptoms and notes but keeps the id and created_at.
    pub async fn upsert_log(
        &self,
        user_id: &str,
        input: &SymptomLogInput,
    ) -> Result<SymptomLog, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());

        let log = match self.get_log_by_date(user_id, &input.date).await? {
            Some(existing) => SymptomLog {
                symptoms: input.symptoms.clone(),
                overall_notes: input.overall_notes.clone(),
                updated_at: now,
                ..existing
            },
            None => SymptomLog {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                date: input.date.clone(),
                symptoms: input.symptoms.clone(),
                overall_notes: input.overall_notes.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SYMPTOM_LOGS)
            .document_id(&log.id)
            .object(&log)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(log)
    }

    /// List a user's logs, optionally restricted to an inclusive date range.
    ///
    /// Sorted by date descending. Without a range the newest
    /// `DEFAULT_LOG_LIMIT` entries are returned to prevent over-fetching.
    pub async fn list_logs(
        &self,
        user_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<SymptomLog>, AppError> {
        let user_id = user_id.to_string();
        let start = start_date.map(str::to_string);
        let end = end_date.map(str::to_string);
        let bounded = start.is_some() || end.is_some();

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SYMPTOM_LOGS)
            .filter(move |q| {
                let mut conditions = vec![q.field("user_id").eq(user_id.clone())];
                if let Some(start) = &start {
                    conditions.push(q.field("date").greater_than_or_equal(start.clone()));
                }
                if let Some(end) = &end {
                    conditions.push(q.field("date").less_than_or_equal(end.clone()));
                }
                q.for_all(conditions)
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)]);

        let query = if bounded {
            query
        } else {
            query.limit(DEFAULT_LOG_LIMIT)
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all logs for a user (batch sync input). No limit applied.
    pub async fn get_all_logs(&self, user_id: &str) -> Result<Vec<SymptomLog>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SYMPTOM_LOGS)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a user's log for a specific date.
    ///
    /// Returns true if a log was deleted, false if none existed.
    pub async fn delete_log_by_date(&self, user_id: &str, date: &str) -> Result<bool, AppError> {
        let Some(log) = self.get_log_by_date(user_id, date).await? else {
            return Ok(false);
        };

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SYMPTOM_LOGS)
            .document_id(&log.id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    // ─── Article Operations ──────────────────────────────────────

    /// List articles, newest first, optionally filtered by category.
    pub async fn list_articles(
        &self,
        category: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<Article>, AppError> {
        let category = category.map(str::to_string);

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ARTICLES);

        let query = if let Some(category) = category {
            query.filter(move |q| q.field("category").eq(category.clone()))
        } else {
            query
        };

        query
            .order_by([(
                "published_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .offset(skip)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
