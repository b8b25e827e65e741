use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::json;

pub mod home_controller;
pub mod sectors_controller;
pub mod ipos_controller;
pub mod alert_rules_controller;
pub mod scrape_controller;
pub mod cron_controller;
pub mod portfolio_controller;

/// `{"detail": msg}` with the given status.
pub(crate) fn detail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": msg.into() }))).into_response()
}

pub(crate) fn unauthorized() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Missing x-user-id header. Please log in.")
}

pub(crate) fn db_error(e: String) -> Response {
    tracing::error!("db error: {}", e);
    detail(StatusCode::INTERNAL_SERVER_ERROR, format!("db error: {e}"))
}

pub(crate) fn parse_id(raw: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(raw).map_err(|_| detail(StatusCode::BAD_REQUEST, "bad id"))
}

/// Serializes a stored document for the API, exposing `_id` as a hex `id`.
pub(crate) fn with_hex_id<T: Serialize>(item: &T, id: ObjectId) -> serde_json::Value {
    let mut value = serde_json::to_value(item).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("_id");
        obj.insert("id".to_string(), json!(id.to_hex()));
    }
    value
}
