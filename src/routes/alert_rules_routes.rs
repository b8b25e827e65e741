use axum::{Router, routing::{get, put}};
use crate::{AppState, controllers::alert_rules_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/alert-rules",
            get(alert_rules_controller::list_rules).post(alert_rules_controller::create_rule),
        )
        .route(
            "/api/alert-rules/:id",
            put(alert_rules_controller::update_rule).delete(alert_rules_controller::delete_rule),
        )
}
