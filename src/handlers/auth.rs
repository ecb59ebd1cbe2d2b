// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, LoginResponse, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

pub(crate) const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, xp, level, created_at";

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(payload.email.to_lowercase())
    .bind(payload.name.trim())
    .bind(&hashed_password)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::Conflict(format!(
                    "Email '{}' is already registered",
                    payload.email
                ));
            }
        }
        tracing::error!("Failed to register user: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(payload.email.to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Same message for both cases so emails cannot be probed.
    let user = user.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(LoginResponse {
        user,
        access_token: token,
        token_type: "Bearer",
    }))
}
