use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::CurrentUser,
    services::ipos_service::{self, IpoPatch, NewIpo},
    AppState,
};

use super::{db_error, detail, parse_id, unauthorized, with_hex_id};

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub portfolio_only: bool,
}

// GET /api/ipos?portfolio_only=true
pub async fn list_ipos(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(q): Query<ListQuery>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match ipos_service::list_user_ipos(&state, &u.id, q.portfolio_only).await {
        Ok(ipos) => {
            let items: Vec<serde_json::Value> = ipos.iter().map(|i| with_hex_id(i, i.id)).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => db_error(e),
    }
}

// POST /api/ipos
pub async fn create_ipo(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<NewIpo>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    if body.company_name.trim().is_empty() {
        return detail(StatusCode::BAD_REQUEST, "company_name is required");
    }

    match ipos_service::create_ipo(&state, &u.id, body).await {
        Ok(ipo) => (StatusCode::CREATED, Json(with_hex_id(&ipo, ipo.id))).into_response(),
        Err(e) => db_error(e),
    }
}

// GET /api/ipos/:id
pub async fn get_ipo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match ipos_service::get_user_ipo(&state, &u.id, oid).await {
        Ok(Some(ipo)) => (StatusCode::OK, Json(with_hex_id(&ipo, ipo.id))).into_response(),
        Ok(None) => detail(StatusCode::NOT_FOUND, "IPO not found"),
        Err(e) => db_error(e),
    }
}

// PUT /api/ipos/:id
pub async fn update_ipo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(patch): Json<IpoPatch>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    if patch.company_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return detail(StatusCode::BAD_REQUEST, "company_name cannot be empty");
    }

    match ipos_service::update_ipo(&state, &u.id, oid, &patch).await {
        Ok(Some(ipo)) => (StatusCode::OK, Json(with_hex_id(&ipo, ipo.id))).into_response(),
        Ok(None) => detail(StatusCode::NOT_FOUND, "IPO not found"),
        Err(e) => db_error(e),
    }
}

// DELETE /api/ipos/:id
pub async fn delete_ipo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match ipos_service::delete_ipo(&state, &u.id, oid).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "IPO deleted" }))).into_response(),
        Err(e) => db_error(e),
    }
}
