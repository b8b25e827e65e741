use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::scrape_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/scrape/groww", post(scrape_controller::scrape_groww))
        .route("/api/scrape/cmp/bulk", post(scrape_controller::scrape_cmp_bulk))
        .route("/api/scrape/cmp/:company_name", get(scrape_controller::scrape_cmp))
}
