use axum::{Router, routing::get};
use crate::{AppState, controllers::portfolio_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/portfolio/summary", get(portfolio_controller::get_summary))
}
