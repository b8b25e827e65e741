use axum::{Router, routing::post};
use crate::{AppState, controllers::cron_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/cron/check-alerts", post(cron_controller::check_alerts))
}
