use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{services::sectors_service, AppState};

use super::{db_error, detail, parse_id, with_hex_id};

#[derive(Deserialize)]
pub struct CreateSectorBody {
    pub name: String,
}

// GET /api/sectors
pub async fn list_sectors(State(state): State<AppState>) -> Response {
    match sectors_service::list_sectors(&state).await {
        Ok(sectors) => {
            let items: Vec<serde_json::Value> =
                sectors.iter().map(|s| with_hex_id(s, s.id)).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => db_error(e),
    }
}

// POST /api/sectors
pub async fn create_sector(
    State(state): State<AppState>,
    Json(body): Json<CreateSectorBody>,
) -> Response {
    let name = body.name.trim();
    if name.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "Sector name is required");
    }

    match sectors_service::sector_exists(&state, name).await {
        Ok(true) => return detail(StatusCode::BAD_REQUEST, "Sector with this name already exists"),
        Ok(false) => {}
        Err(e) => return db_error(e),
    }

    match sectors_service::create_sector(&state, name).await {
        Ok(sector) => (StatusCode::CREATED, Json(with_hex_id(&sector, sector.id))).into_response(),
        Err(e) => db_error(e),
    }
}

// DELETE /api/sectors/:id
pub async fn delete_sector(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match sectors_service::delete_sector(&state, oid).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Sector deleted" }))).into_response(),
        Err(e) => db_error(e),
    }
}
