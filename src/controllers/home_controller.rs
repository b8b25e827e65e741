use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use mongodb::bson::doc;
use serde_json::json;

use crate::AppState;

use super::detail;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() })),
    )
}

pub async fn health_db(State(state): State<AppState>) -> Response {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "mongo": "ok" }))).into_response(),
        Err(e) => detail(StatusCode::INTERNAL_SERVER_ERROR, format!("mongo error: {e}")),
    }
}

pub async fn not_found() -> Response {
    detail(StatusCode::NOT_FOUND, "Not Found")
}
