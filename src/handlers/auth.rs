// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, NewUser, RegisterRequest, SetupUserRequest, VerifyOtpRequest},
    state::AppState,
    utils::{
        extract::AppJson,
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Creates a user directly, without OTP verification.
///
/// Only available when `ENABLE_SETUP_USER` is on; otherwise it behaves like a missing route.
pub async fn setup_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetupUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.config.enable_setup_user {
        return Err(AppError::NotFound("Not Found".to_string()));
    }
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if state.store.find_user_by_username(&payload.username).await?.is_some() {
        return Err(AppError::BadRequest("Username taken".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    state
        .store
        .create_user(NewUser {
            username: payload.username.clone(),
            password_hash,
            role: payload.role,
            email: payload.email,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to create user {}: {:?}", payload.username, e);
            AppError::from(e)
        })?;

    tracing::info!("User {} created successfully as {}", payload.username, payload.role);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

/// Starts a registration: validates input, parks it behind an OTP and mails the code.
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if state.store.find_user_by_username(&payload.username).await?.is_some() {
        return Err(AppError::BadRequest("Username taken or invalid data".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let otp = state
        .otps
        .issue(&payload.username, &payload.email, password_hash, payload.role)
        .await;

    state
        .mailer
        .send_otp(&payload.email, &otp)
        .await
        .map_err(|e| {
            tracing::error!("Failed to send OTP email: {}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(json!({
        "message": format!("OTP sent to {}", payload.email)
    })))
}

/// Completes a registration once the emailed OTP is confirmed.
pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pending = state
        .otps
        .verify(&payload.username, &payload.otp)
        .await
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OTP".to_string()))?;

    let user = state
        .store
        .create_user(NewUser {
            username: pending.username,
            password_hash: pending.password_hash,
            role: pending.role,
            email: pending.email,
        })
        .await?;

    tracing::info!("User {} registered successfully", user.username);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered" })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown users and wrong passwords get the same 401 response.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let user = state
        .store
        .find_user_by_username(&payload.username)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?;

    let Some(user) = user else {
        tracing::info!("Login failed: user {} not found", payload.username);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    };

    if !verify_password(&payload.password, &user.password)? {
        tracing::info!("Login failed: wrong password for {}", user.username);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.username,
        user.role(),
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    tracing::info!("Login successful for {} ({})", user.username, user.role);
    Ok(Json(json!({
        "token": token,
        "role": user.role,
    })))
}
