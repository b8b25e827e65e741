use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{models::CurrentUser, services::portfolio_service, AppState};

use super::{db_error, unauthorized};

// GET /api/portfolio/summary
pub async fn get_summary(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match portfolio_service::portfolio_summary(&state, &u.id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => db_error(e),
    }
}
