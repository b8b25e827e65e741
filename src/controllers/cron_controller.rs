use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{auth, services::alert_monitor, AppState};

use super::detail;

// POST /api/cron/check-alerts
pub async fn check_alerts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !auth::cron_secret_ok(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Invalid cron secret");
    }

    match alert_monitor::run_with_state(&state).await {
        Ok(summary) => {
            let message = if summary.ipos_checked == 0 {
                "No portfolio IPOs found"
            } else {
                "Alert check complete"
            };

            (
                StatusCode::OK,
                Json(json!({
                    "message": message,
                    "ipos_checked": summary.ipos_checked,
                    "cmp_fetched": summary.cmp_fetched,
                    "alerts_triggered": summary.alerts_triggered,
                    "alerts_sent": summary.alerts_sent,
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("alert check failed: {}", e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
