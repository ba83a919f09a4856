use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use travel_db::{Database, UserRow};
use travel_types::api::{
    Claims, CreateAccountRequest, CreateAccountResponse, LoginRequest, LoginResponse,
};
use travel_types::models::UserSummary;

use crate::error::{ApiError, ApiResult, OrInternal};
use crate::extract::JsonBody;
use crate::storage::ImageStore;
use crate::validation::{is_valid_email, normalize_email, required};
use crate::with_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub images: ImageStore,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub max_upload_bytes: usize,
}

/// POST /create-account
pub async fn create_account(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(full_name), Some(email), Some(password)) = (
        required(req.full_name.as_deref()),
        required(req.email.as_deref()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address."));
    }

    let lookup = email.clone();
    let existing = with_db(&state, move |db| db.get_user_by_email(&lookup))
        .await
        .or_internal("Error creating account.")?;
    if existing.is_some() {
        return Err(ApiError::bad_request("User already exists."));
    }

    // Argon2 runs on the blocking pool.
    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .or_internal("Error creating account.")?
        .or_internal("Error creating account.")?;

    let user = UserRow {
        id: Uuid::new_v4().to_string(),
        full_name: full_name.to_string(),
        email,
        password: password_hash,
        created_at: chrono::Utc::now().timestamp_millis(),
    };

    let row = user.clone();
    let created = with_db(&state, move |db| db.create_user(&row))
        .await
        .or_internal("Error creating account.")?;
    if !created {
        // Lost a race with a concurrent registration for the same email.
        return Err(ApiError::bad_request("User already exists."));
    }

    let user_id: Uuid = user.id.parse().or_internal("Error creating account.")?;
    let access_token = create_token(&state.jwt_secret, state.token_ttl, user_id, &user.email)
        .or_internal("Error creating account.")?;

    info!("Registered {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            error: false,
            user: UserSummary {
                full_name: user.full_name,
                email: user.email,
            },
            access_token,
            message: "Registration Successful".into(),
        }),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (
        required(req.email.as_deref()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };

    let email = normalize_email(email);
    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await
        .or_internal("Error logging in.")?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let password = password.to_string();
    let stored_hash = user.password.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .or_internal("Error logging in.")?
        .or_internal("Error logging in.")?;
    if !matches {
        return Err(ApiError::unauthorized("Invalid credentials."));
    }

    let user_id: Uuid = user.id.parse().or_internal("Error logging in.")?;
    let access_token = create_token(&state.jwt_secret, state.token_ttl, user_id, &user.email)
        .or_internal("Error logging in.")?;

    Ok(Json(LoginResponse {
        error: false,
        message: "Login Successful".into(),
        user: UserSummary {
            full_name: user.full_name,
            email: user.email,
        },
        access_token,
    }))
}

/// Hash with Argon2id and a random salt, in PHC string form.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only if the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: Uuid,
    email: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
