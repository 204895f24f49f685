/*
 * Responsibility
 * - GET /health (liveness)
 * - Outside the access middleware; never calls downstream
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
