//! User model for storage and API.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (uuid, also used as document ID)
    pub id: String,
    /// Email address (unique, used for login)
    pub email: String,
    /// Display name
    pub name: String,
    /// PBKDF2 password hash (`iterations$salt_b64$hash_b64`)
    pub password_hash: String,
    /// Age range (e.g. "45-54")
    pub age_range: Option<String>,
    /// Menstrual status (e.g. "perimenopause")
    pub menstrual_status: Option<String>,
    /// Primary symptoms selected during onboarding
    pub primary_symptoms: Vec<String>,
    /// Whether onboarding is complete
    pub onboarding_completed: bool,
    /// Encrypted Google OAuth credentials (None until calendar is connected)
    pub google_auth: Option<GoogleAuthData>,
    /// Google Calendar sync settings
    pub calendar_settings: CalendarSettings,
    /// Account creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}

impl User {
    /// Whether the user has a Google Calendar linked (durable secret stored).
    pub fn calendar_connected(&self) -> bool {
        self.google_auth
            .as_ref()
            .is_some_and(|auth| !auth.encrypted_refresh_token.is_empty())
    }
}

/// Encrypted Google OAuth credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAuthData {
    /// Encrypted Google OAuth refresh token (base64)
    pub encrypted_refresh_token: String,
    /// When the token was first stored (RFC3339)
    pub token_created_at: String,
}

/// Google Calendar sync settings, kept alongside the user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Whether calendar sync is enabled
    pub is_enabled: bool,
    /// ID of the provisioned "Altheia Health" calendar
    pub calendar_id: Option<String>,
    /// Timestamp of the last successful sync (RFC3339)
    pub last_sync: Option<String>,
}

/// Signup request body.
#[derive(Debug, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub age_range: Option<String>,
    pub menstrual_status: Option<String>,
    #[serde(default)]
    pub primary_symptoms: Vec<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
}

/// Profile update request body. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub age_range: Option<String>,
    pub menstrual_status: Option<String>,
    pub primary_symptoms: Option<Vec<String>>,
    pub onboarding_completed: Option<bool>,
}

impl UserUpdate {
    /// True when no field is set (nothing to update).
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age_range.is_none()
            && self.menstrual_status.is_none()
            && self.primary_symptoms.is_none()
            && self.onboarding_completed.is_none()
    }
}

/// User profile for API responses (excludes sensitive data).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub age_range: Option<String>,
    pub menstrual_status: Option<String>,
    pub primary_symptoms: Vec<String>,
    pub onboarding_completed: bool,
    pub calendar_connected: bool,
    pub calendar_sync_enabled: bool,
    pub last_calendar_sync: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let connected = user.calendar_connected();
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            age_range: user.age_range,
            menstrual_status: user.menstrual_status,
            primary_symptoms: user.primary_symptoms,
            onboarding_completed: user.onboarding_completed,
            calendar_connected: connected,
            calendar_sync_enabled: connected && user.calendar_settings.is_enabled,
            last_calendar_sync: if connected {
                user.calendar_settings.last_sync
            } else {
                None
            },
            created_at: user.created_at,
        }
    }
}
