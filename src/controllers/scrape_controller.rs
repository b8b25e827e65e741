use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::AppState;

use super::detail;

#[derive(Deserialize)]
pub struct GrowwBody {
    pub url: String,
}

#[derive(Deserialize)]
pub struct BulkCmpBody {
    #[serde(default)]
    pub company_names: Vec<String>,
}

// POST /api/scrape/groww
pub async fn scrape_groww(State(state): State<AppState>, Json(body): Json<GrowwBody>) -> Response {
    let url = body.url.trim();
    if url.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "url is required");
    }

    let ipo = state.groww.scrape_ipo(url).await;
    (StatusCode::OK, Json(ipo)).into_response()
}

// GET /api/scrape/cmp/:company_name
pub async fn scrape_cmp(State(state): State<AppState>, Path(company_name): Path<String>) -> Response {
    let details = state.screener.stock_details(company_name.trim()).await;
    (StatusCode::OK, Json(details)).into_response()
}

// POST /api/scrape/cmp/bulk
pub async fn scrape_cmp_bulk(
    State(state): State<AppState>,
    Json(body): Json<BulkCmpBody>,
) -> Response {
    let names: Vec<String> = body
        .company_names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let delay = Duration::from_millis(state.settings.scrape_delay_ms);
    let quotes = state.screener.quote_many(&names, delay).await;
    (StatusCode::OK, Json(quotes)).into_response()
}
