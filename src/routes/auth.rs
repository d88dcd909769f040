// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::models::{User, UserCreate, UserResponse, UserUpdate};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Public routes: account creation and login.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
}

/// Profile routes (require authentication, layered in routes/mod.rs).
pub fn me_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/me", put(update_me))
}

// ─── Password Hashing ────────────────────────────────────────

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = ring::digest::SHA256_OUTPUT_LEN;

/// Hash a password with PBKDF2-HMAC-SHA256.
/// Stored form: `iterations$salt_b64$hash_b64`.
fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate salt")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(PBKDF2_ITERATIONS).expect("iterations are non-zero"),
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{}${}${}",
        PBKDF2_ITERATIONS,
        BASE64.encode(salt),
        BASE64.encode(hash)
    ))
}

/// Verify a password against a stored hash (constant-time comparison).
fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.splitn(3, '$').collect();
    if parts.len() != 3 {
        return false;
    }

    let Some(iterations) = parts[0].parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(parts[1]), BASE64.decode(parts[2])) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

// ─── Handlers ────────────────────────────────────────────────

/// Token + profile returned on signup and login.
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

/// Register a new user and auto-login.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(input): Json<UserCreate>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.get_user_by_email(&input.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: input.email,
        name: input.name,
        password_hash: hash_password(&input.password)?,
        age_range: input.age_range,
        menstrual_status: input.menstrual_status,
        primary_symptoms: input.primary_symptoms,
        onboarding_completed: input.onboarding_completed,
        google_auth: None,
        calendar_settings: Default::default(),
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.upsert_user(&user).await?;

    let token = create_jwt(
        &user.id,
        &state.config.jwt_signing_key,
        state.config.jwt_expire_minutes,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            user: Some(user.into()),
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Authenticate and return a JWT.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state.db.get_user_by_email(&input.email).await?;

    // Uniform failure for unknown email and wrong password
    let authenticated = user
        .filter(|u| verify_password(&input.password, &u.password_hash))
        .ok_or(AppError::Unauthorized)?;

    let token = create_jwt(
        &authenticated.id,
        &state.config.jwt_signing_key,
        state.config.jwt_expire_minutes,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %authenticated.id, "User logged in");

    Ok(Json(AuthResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: None,
    }))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.db.require_user(&user.user_id).await?;
    Ok(Json(profile.into()))
}

/// Update current user profile. Absent fields are left unchanged.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    update
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if update.is_empty() {
        return Err(AppError::BadRequest(
            "No data provided for update".to_string(),
        ));
    }

    let mut profile = state.db.require_user(&user.user_id).await?;

    if let Some(name) = update.name {
        profile.name = name;
    }
    if let Some(age_range) = update.age_range {
        profile.age_range = Some(age_range);
    }
    if let Some(status) = update.menstrual_status {
        profile.menstrual_status = Some(status);
    }
    if let Some(symptoms) = update.primary_symptoms {
        profile.primary_symptoms = symptoms;
    }
    if let Some(done) = update.onboarding_completed {
        profile.onboarding_completed = done;
    }
    profile.updated_at = format_utc_rfc3339(chrono::Utc::now());

    state.db.upsert_user(&profile).await?;

    Ok(Json(profile.into()))
}
