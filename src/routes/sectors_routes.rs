use axum::{Router, routing::{delete, get}};
use crate::{AppState, controllers::sectors_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/sectors",
            get(sectors_controller::list_sectors).post(sectors_controller::create_sector),
        )
        .route("/api/sectors/:id", delete(sectors_controller::delete_sector))
}
