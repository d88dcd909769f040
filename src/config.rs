//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; secrets (JWT key, encryption key,
//! OAuth client secret, Gemini key) stay cached in memory for the lifetime
//! of the process.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::env;

/// Length of the AES-256-GCM token encryption key in bytes.
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Deployment environment ("development" / "production")
    pub app_env: String,
    /// Server port
    pub port: u16,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Allowed CORS origins (comma-separated in the env var)
    pub cors_origins: Vec<String>,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth redirect URI registered with the client
    pub google_redirect_uri: String,
    /// JWT session lifetime in minutes
    pub jwt_expire_minutes: i64,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
    /// AES-256-GCM key for refresh-token encryption at rest
    pub encryption_key: [u8; ENCRYPTION_KEY_LEN],
    /// Google Gemini API key for the chat proxy
    pub gemini_api_key: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            app_env: "test".to_string(),
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            gcp_project_id: "test-project".to_string(),
            google_client_id: "test_client_id".to_string(),
            google_redirect_uri: "http://localhost:8000/api/google-calendar/callback".to_string(),
            jwt_expire_minutes: 10080,
            google_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            encryption_key: [7u8; ENCRYPTION_KEY_LEN],
            gemini_api_key: "test_gemini_key".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            // Non-sensitive config from env
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("GOOGLE_REDIRECT_URI"))?,
            jwt_expire_minutes: env::var("JWT_EXPIRE_MINUTES")
                .unwrap_or_else(|_| "10080".to_string())
                .parse()
                .unwrap_or(10080),

            // Secrets
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            jwt_signing_key: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
            encryption_key: parse_encryption_key(
                &env::var("ENCRYPTION_KEY").map_err(|_| ConfigError::Missing("ENCRYPTION_KEY"))?,
            )?,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .map_err(|_| ConfigError::Missing("GEMINI_API_KEY"))?,
        })
    }
}

/// Decode the base64 encryption key and check its length.
fn parse_encryption_key(raw: &str) -> Result<[u8; ENCRYPTION_KEY_LEN], ConfigError> {
    let bytes = BASE64
        .decode(raw.trim())
        .map_err(|_| ConfigError::Invalid("ENCRYPTION_KEY must be base64"))?;

    bytes
        .try_into()
        .map_err(|_| ConfigError::Invalid("ENCRYPTION_KEY must decode to 32 bytes"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value: {0}")]
    Invalid(&'static str),
}
