use axum::{Router, routing::get};
use crate::{AppState, controllers::ipos_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/ipos",
            get(ipos_controller::list_ipos).post(ipos_controller::create_ipo),
        )
        .route(
            "/api/ipos/:id",
            get(ipos_controller::get_ipo)
                .put(ipos_controller::update_ipo)
                .delete(ipos_controller::delete_ipo),
        )
}
