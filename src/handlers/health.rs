// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{db::DynStore, error::AppError};

/// Liveness plus a store round-trip.
pub async fn health(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    store
        .ping()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Store unavailable: {}", e)))?;
    Ok(Json(json!({ "status": "ok" })))
}
