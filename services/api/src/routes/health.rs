//! Liveness endpoint

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = if common::database::health_check(&state.db_pool).await {
        "ok"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "env": state.config.server.env,
        "database": database,
    }))
}
